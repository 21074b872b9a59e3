use crate::config::Config;
use crate::routes::AdviceRequest;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FALLBACK_ADVICE: &str = "Je n'ai pas pu générer de conseil cette fois.";

const SYSTEM_PROMPT: &str = "Tu es un assistant météo qui donne des conseils simples et utiles.";

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Rate limited")]
    RateLimited,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

// Every level is optional: a well-formed reply without text is not an error.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Chat-completion client producing one-sentence weather tips.
pub struct AiClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AiClient {
    pub fn new(config: &Config) -> Result<Self, AiError> {
        let client = Client::builder()
            .user_agent(concat!("WeatherAdvice/", env!("CARGO_PKG_VERSION")))
            .timeout(config.provider_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            max_tokens: config.advice_max_tokens,
            temperature: config.advice_temperature,
        })
    }

    /// Returns a trimmed tip, or [`FALLBACK_ADVICE`] when the model answered
    /// with nothing usable.
    pub async fn weather_advice(&self, request: &AdviceRequest) -> Result<String, AiError> {
        let prompt = build_advice_prompt(request);
        let reply = self.chat_completion(&prompt).await?;

        Ok(reply
            .first_text()
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_ADVICE.to_string()))
    }

    async fn chat_completion(&self, prompt: &str) -> Result<ChatResponse, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body = response.bytes().await?;
                let chat_response: ChatResponse = serde_json::from_slice(&body)?;
                Ok(chat_response)
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(AiError::RateLimited),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(AiError::ApiError(format!("HTTP {}: {}", status, error_text)))
            }
        }
    }
}

pub fn build_advice_prompt(request: &AdviceRequest) -> String {
    format!(
        "Ville : {}\n\
         Température : {}°C\n\
         Conditions : {}\n\
         Vent : {} m/s\n\n\
         Donne un seul conseil météo en français, en une phrase courte et conviviale :\n\
         - parle au tutoiement\n\
         - ne donne PAS la température à nouveau\n\
         - adapte-toi aux conditions (pluie, chaleur, vent, froid)",
        request.city, request.temp, request.description, request.wind_speed
    )
}
