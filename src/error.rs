use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

pub const CITY_REQUIRED: &str = "Paramètre 'city' requis";
pub const CITY_NOT_FOUND: &str = "Ville non trouvée";
pub const WEATHER_UPSTREAM_FAILED: &str = "Erreur lors de la récupération météo";
pub const ADVICE_INPUT_INVALID: &str = "Données météo invalides ou manquantes";
pub const ADVICE_UPSTREAM_FAILED: &str = "Erreur lors de la génération IA";
pub const TOO_MANY_REQUESTS: &str = "Trop de requêtes, réessaie dans quelques instants";

/// Failures surfaced by the relay endpoints.
///
/// Only the fixed user-facing message is ever written to the response body;
/// the source of an upstream failure goes to the log.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{message}: {cause:#}")]
    Upstream {
        message: &'static str,
        cause: anyhow::Error,
    },
    #[error("rate limited, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
}

impl ApiError {
    pub fn upstream(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ApiError::Upstream {
            message,
            cause: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Validation(message) | ApiError::NotFound(message) => *message,
            ApiError::Upstream { message, .. } => *message,
            ApiError::RateLimited { .. } => TOO_MANY_REQUESTS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream { message, cause } => {
                tracing::error!("{}: {:#}", message, cause);
            }
            _ => tracing::debug!("Rejected request: {}", self),
        }

        let body = Json(ErrorBody {
            error: self.user_message().to_string(),
        });
        let mut response = (self.status(), body).into_response();

        if let ApiError::RateLimited { retry_after } = &self {
            // Round up so clients never retry inside the window
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
