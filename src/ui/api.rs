use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::error::WEATHER_UPSTREAM_FAILED;
use crate::routes::{AdviceRequest, AdviceResponse};

const ADVICE_FAILED: &str = "Erreur IA";

#[derive(Error, Debug)]
pub enum ClientError {
    /// The relay answered with an error status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected { message, .. } => message.clone(),
            ClientError::Transport(e) => format!("Serveur injoignable : {}", e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<String>,
}

/// HTTP client for the relay's two endpoints.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn weather(&self, city: &str) -> Result<Value, ClientError> {
        let response = self
            .client
            .get(format!("{}/api/weather", self.base_url))
            .query(&[("city", city)])
            .send()
            .await?;

        let response = ensure_success(response, WEATHER_UPSTREAM_FAILED).await?;
        Ok(response.json().await?)
    }

    pub async fn advice(&self, request: &AdviceRequest) -> Result<String, ClientError> {
        let response = self
            .client
            .post(format!("{}/api/ai-advice", self.base_url))
            .json(request)
            .send()
            .await?;

        let response = ensure_success(response, ADVICE_FAILED).await?;
        let body: AdviceResponse = response.json().await?;
        Ok(body.advice)
    }
}

// Non-2xx: take the relay's `error` field, or the fallback when it has none.
async fn ensure_success(response: Response, fallback: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorPayload>()
        .await
        .ok()
        .and_then(|p| p.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());

    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}
