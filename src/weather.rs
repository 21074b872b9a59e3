use crate::config::Config;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("City not found: {0}")]
    NotFound(String),
    #[error("Rate limited by provider")]
    RateLimited,
    #[error("API error: HTTP {status}: {body}")]
    ApiError { status: u16, body: String },
}

/// Current-weather lookups against the OpenWeather API.
///
/// The payload is returned as untyped JSON so the relay can pass it through
/// untouched. There is no retry: one attempt, then the error propagates.
pub struct OpenWeatherClient {
    client: Client,
    url: String,
    api_key: String,
    lang: String,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent(concat!("WeatherAdvice/", env!("CARGO_PKG_VERSION")))
            .timeout(config.provider_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.weather_url(),
            api_key: config.openweather_api_key.clone(),
            lang: config.weather_lang.clone(),
        })
    }

    pub async fn current_by_city(&self, city: &str) -> Result<Value, OpenWeatherError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", city),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body = response.bytes().await?;
                let json: Value = serde_json::from_slice(&body)?;
                Ok(json)
            }
            reqwest::StatusCode::NOT_FOUND => Err(OpenWeatherError::NotFound(city.to_string())),
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(OpenWeatherError::RateLimited),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(OpenWeatherError::ApiError {
                    status: status.as_u16(),
                    body: error_text,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        let vars: HashMap<&str, String> = HashMap::from([
            ("OPENWEATHER_KEY", "ow-test".to_string()),
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENWEATHER_BASE_URL", server.uri()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        OpenWeatherClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_sends_metric_french_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Lyon"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "fr"))
            .and(query_param("appid", "ow-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "Lyon"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let payload = client_for(&server).current_by_city("Lyon").await.unwrap();
        assert_eq!(payload["name"], "Lyon");
    }

    #[tokio::test]
    async fn test_maps_provider_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Atlantis"))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                serde_json::json!({"cod": "404", "message": "city not found"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Busy"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Locked"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.current_by_city("Atlantis").await,
            Err(OpenWeatherError::NotFound(_))
        ));
        assert!(matches!(
            client.current_by_city("Busy").await,
            Err(OpenWeatherError::RateLimited)
        ));
        assert!(matches!(
            client.current_by_city("Locked").await,
            Err(OpenWeatherError::ApiError { status: 401, .. })
        ));
        assert!(matches!(
            client.current_by_city("Garbled").await,
            Err(OpenWeatherError::JsonParsing(_))
        ));
    }
}
