//! Request middleware: shared-secret auth, rate limiting, deadlines and
//! panic recovery.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prepwire_core::Error;
use tracing::{error, warn};

use crate::SharedState;
use crate::error::ApiError;

/// Routes open to everyone: no secret, no rate limit.
pub fn is_public_path(path: &str) -> bool {
    matches!(path, "/" | "/api/health")
}

// --- Rate Limiter ---

/// In-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key. Thread-safe via
/// `std::sync::Mutex` (non-async, held briefly).
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Returns `true` if the request is allowed. A limit of zero disables limiting.
    pub fn check(&self, client_key: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Evict idle clients once the map gets large.
        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Credential presented by the caller, from `Authorization: Bearer` or `X-API-Key`.
fn presented_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Rate-limit key: first `X-Forwarded-For` hop, else the presented
/// credential, else `"anonymous"`.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|ip| format!("ip:{ip}"))
        .or_else(|| presented_secret(headers).map(|token| format!("token:{token}")))
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let key = client_key(req.headers());
    if !state.rate_limiter.check(&key) {
        // Token keys are credentials: log only the key kind.
        let kind = key.split(':').next().unwrap_or("anonymous");
        warn!(client_kind = kind, path = %req.uri().path(), "Rate limit exceeded");
        return ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
    }

    next.run(req).await
}

/// Shared-secret authentication. A no-op when no secret is configured.
pub async fn auth_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(secret) = &state.shared_secret else {
        return next.run(req).await;
    };
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let authorized = presented_secret(req.headers()).is_some_and(|c| secret.verify(c));
    if !authorized {
        warn!(path = %req.uri().path(), "Unauthorized request: missing or invalid shared secret");
        return ApiError::from(Error::Unauthorized).into_response();
    }

    next.run(req).await
}

/// Handler deadline. Dropping the inner future cancels any upstream call
/// still in flight.
pub async fn timeout_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    match tokio::time::timeout(state.request_timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(
                path = %path,
                timeout_secs = state.request_timeout.as_secs(),
                "Request timed out"
            );
            ApiError::from(Error::Timeout).into_response()
        }
    }
}

/// Last-resort handler for panics inside request handling.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %message, "Handler panicked");
    ApiError::from(Error::Internal(message.to_string())).into_response()
}
