use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::{
    ai::AiClient,
    config::{AllowedOrigins, Config},
    error::{
        ApiError, ErrorBody, ADVICE_INPUT_INVALID, ADVICE_UPSTREAM_FAILED, CITY_NOT_FOUND,
        CITY_REQUIRED, WEATHER_UPSTREAM_FAILED,
    },
    rate_limit::{limit_requests, RateLimiter},
    weather::{OpenWeatherClient, OpenWeatherError},
};

const MAX_BODY_BYTES: usize = 100 * 1024;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub weather_client: Arc<OpenWeatherClient>,
    pub ai_client: Arc<AiClient>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let weather_client = Arc::new(OpenWeatherClient::new(&config)?);
        let ai_client = Arc::new(AiClient::new(&config)?);
        let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);

        Ok(Self {
            config: Arc::new(config),
            weather_client,
            ai_client,
            rate_limiter,
        })
    }
}

// Request/Response types
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherQuery {
    /// City name, e.g. `Paris`
    pub city: Option<String>,
}

/// Weather summary sent by the client to obtain a tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdviceRequest {
    pub city: String,
    pub temp: f64,
    pub description: String,
    #[serde(rename = "windSpeed", default)]
    pub wind_speed: f64,
}

impl AdviceRequest {
    /// Checks field types by hand so that every malformed body is a 400.
    /// A missing or `null` wind speed counts as calm air.
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let invalid = || ApiError::Validation(ADVICE_INPUT_INVALID);

        let city = body
            .get("city")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(invalid)?;
        let temp = body
            .get("temp")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite())
            .ok_or_else(invalid)?;
        let description = body
            .get("description")
            .and_then(Value::as_str)
            .ok_or_else(invalid)?;
        let wind_speed = match body.get("windSpeed") {
            None | Some(Value::Null) => 0.0,
            Some(value) => value
                .as_f64()
                .filter(|w| w.is_finite())
                .ok_or_else(invalid)?,
        };

        Ok(Self {
            city: city.to_string(),
            temp,
            description: description.to_string(),
            wind_speed,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdviceResponse {
    pub advice: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current weather for a city, passed through from the provider.
#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Provider payload, unmodified"),
        (status = 400, description = "Missing city", body = ErrorBody),
        (status = 404, description = "Unknown city", body = ErrorBody),
        (status = 429, description = "Too many requests", body = ErrorBody),
        (status = 500, description = "Provider failure", body = ErrorBody)
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = query.map_err(|rejection| {
        tracing::debug!("Unreadable weather query: {}", rejection);
        ApiError::Validation(CITY_REQUIRED)
    })?;
    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::Validation(CITY_REQUIRED))?;

    match state.weather_client.current_by_city(city).await {
        Ok(payload) => Ok(Json(payload)),
        Err(OpenWeatherError::NotFound(city)) => {
            tracing::info!("City not found: {}", city);
            Err(ApiError::NotFound(CITY_NOT_FOUND))
        }
        Err(e) => Err(ApiError::upstream(WEATHER_UPSTREAM_FAILED, e)),
    }
}

/// One short weather tip generated by the language model.
#[utoipa::path(
    post,
    path = "/api/ai-advice",
    request_body = AdviceRequest,
    responses(
        (status = 200, description = "Generated tip", body = AdviceResponse),
        (status = 400, description = "Invalid weather summary", body = ErrorBody),
        (status = 429, description = "Too many requests", body = ErrorBody),
        (status = 500, description = "Provider failure", body = ErrorBody)
    )
)]
pub async fn post_ai_advice(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AdviceResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!("Unreadable advice body: {}", rejection);
        ApiError::Validation(ADVICE_INPUT_INVALID)
    })?;
    let request = AdviceRequest::from_json(&body)?;

    let advice = state
        .ai_client
        .weather_advice(&request)
        .await
        .map_err(|e| ApiError::upstream(ADVICE_UPSTREAM_FAILED, e))?;

    Ok(Json(AdviceResponse { advice }))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_weather, post_ai_advice),
    components(schemas(AdviceRequest, AdviceResponse, ErrorBody))
)]
pub struct ApiDoc;

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::from(Any),
        AllowedOrigins::List(list) => AllowOrigin::list(
            list.iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                }),
        ),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ("x-dns-prefetch-control", "off"),
];

// Create the router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/weather", get(get_weather))
        .route("/ai-advice", post(post_ai_advice))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_requests));

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(*name),
            HeaderValue::from_static(*value),
        ));
    }

    router
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
