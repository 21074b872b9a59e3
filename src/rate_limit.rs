use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use moka::future::Cache;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    hits: AtomicU32,
}

impl Window {
    fn open(now: Instant) -> Arc<Self> {
        Arc::new(Self {
            opened_at: now,
            hits: AtomicU32::new(0),
        })
    }
}

/// Fixed-window request counter per client.
///
/// A client's first request opens its window; every request inside it bumps
/// an atomic counter. Idle clients are evicted once their window expires.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Cache<String, Arc<Window>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let windows = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(window)
            .build();

        Self {
            windows,
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub async fn check(&self, client: &str) -> RateDecision {
        let now = Instant::now();
        let period = self.window;
        // Expired windows are reopened under the entry lock
        let window = self
            .windows
            .entry_by_ref(client)
            .and_upsert_with(|current| async move {
                match current.map(|entry| entry.into_value()) {
                    Some(window) if now.saturating_duration_since(window.opened_at) < period => {
                        window
                    }
                    _ => Window::open(now),
                }
            })
            .await
            .into_value();

        let hits = window.hits.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if hits > self.max_requests {
            let elapsed = now.saturating_duration_since(window.opened_at);
            RateDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        } else {
            RateDecision::Allowed {
                remaining: self.max_requests - hits,
            }
        }
    }
}

/// Identifies the caller: the first `X-Forwarded-For` hop when running behind
/// a trusted proxy, otherwise the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(request.headers(), peer, state.config.trust_proxy);

    match state.rate_limiter.check(&key).await {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                "x-ratelimit-limit",
                HeaderValue::from(state.rate_limiter.max_requests()),
            );
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        RateDecision::Limited { retry_after } => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}
