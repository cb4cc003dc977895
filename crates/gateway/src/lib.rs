//! HTTP gateway for Prepwire.
//!
//! Exposes the interview endpoints over a small JSON API. Every request is
//! independent: the client sends the whole conversation each time and the
//! gateway keeps nothing between calls.
//!
//! Built on Axum.

pub mod api;
pub mod error;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use prepwire_config::{AppConfig, GatewayConfig};
use prepwire_core::Error;
use prepwire_interview::{EngineSettings, InterviewEngine};
use prepwire_security::SharedSecret;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::middleware::RateLimiter;

/// Shared application state. Read-only after startup.
pub struct AppState {
    pub engine: Arc<InterviewEngine>,
    pub gateway: GatewayConfig,
    pub shared_secret: Option<SharedSecret>,
    pub rate_limiter: RateLimiter,
    pub request_timeout: Duration,
    /// Known credentials, scrubbed from error details.
    pub secrets: Vec<String>,
    pub start_time: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(engine: InterviewEngine, config: &AppConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            gateway: config.gateway.clone(),
            shared_secret: config.gateway.shared_secret.as_deref().map(SharedSecret::new),
            rate_limiter: RateLimiter::per_minute(config.gateway.rate_limit_per_minute),
            request_timeout: Duration::from_secs(config.gateway.request_timeout_secs),
            secrets: config.secrets(),
            start_time: Utc::now(),
        }
    }

    /// Log a failed request and turn it into a JSON error.
    pub fn reject(&self, err: Error) -> ApiError {
        let status = err.status_code();
        if status >= 500 {
            error!(status, error = %err.public_message(), "Request failed");
        } else {
            warn!(status, error = %err.public_message(), "Request rejected");
        }
        ApiError::from_error(&err, self.gateway.expose_error_details, &self.secrets)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // No configured origins: same-origin only.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .max_age(Duration::from_secs(3600))
}

/// Build the router with all routes and middleware.
///
/// Layers, outermost first:
/// - HTTP trace logging
/// - CORS
/// - Panic recovery (JSON 500)
/// - Request deadline (JSON 408)
/// - Request body size limit
/// - Per-client rate limiting
/// - Shared-secret authentication
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.gateway.allowed_origins);
    let body_limit = state.gateway.body_limit_bytes;

    Router::new()
        .route("/", get(api::info))
        .route("/api/health", get(api::health))
        .route("/api/real-interview", post(api::real_interview))
        .route("/api/mock-interview", post(api::mock_interview))
        .route("/api/quick-answer", post(api::quick_answer))
        .route("/api/tts", post(api::tts))
        .fallback(api::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(state.clone(), middleware::timeout_middleware))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and run until Ctrl-C / SIGTERM.
///
/// Upstream clients are built once here and shared by every request.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let upstreams = prepwire_providers::build_from_config(&config)?;
    let engine = InterviewEngine::new(upstreams.chat, EngineSettings::from_config(&config))
        .with_speech(upstreams.speech)
        .with_secrets(config.secrets());

    let state = Arc::new(AppState::new(engine, &config));
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    info!(
        addr = %addr,
        model = %config.model,
        auth = config.gateway.shared_secret.is_some(),
        "Gateway starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
