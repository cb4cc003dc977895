//! Endpoint handlers.
//!
//! Each handler parses the body itself so that malformed JSON, a missing
//! content type and oversized bodies all produce the same JSON error shape.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use prepwire_core::Error;
use prepwire_interview::validate::{
    validate_interview, validate_mock_interview, validate_quick_answer, validate_speech,
};
use prepwire_interview::{InterviewReply, MockInterviewReply, QuickAnswer};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::SharedState;
use crate::error::ApiError;

/// Successful JSON reply: `{"success": true, ...payload}`.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T> ApiSuccess<T> {
    fn ok(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

fn parse_json(state: &SharedState, body: Result<Bytes, BytesRejection>) -> Result<Value, ApiError> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
        } else {
            state.reject(Error::InvalidInput("Invalid JSON body".into()))
        }
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        debug!(error = %e, "Rejected malformed JSON body");
        state.reject(Error::InvalidInput("Invalid JSON body".into()))
    })
}

/// `POST /api/real-interview`
pub async fn real_interview(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiSuccess<InterviewReply>>, ApiError> {
    let payload = parse_json(&state, body)?;
    let request = validate_interview(&payload).map_err(|e| state.reject(e))?;
    let reply = state
        .engine
        .real_interview(&request)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiSuccess::ok(reply))
}

/// `POST /api/mock-interview`
pub async fn mock_interview(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiSuccess<MockInterviewReply>>, ApiError> {
    let payload = parse_json(&state, body)?;
    let request = validate_mock_interview(&payload).map_err(|e| state.reject(e))?;
    let reply = state
        .engine
        .mock_interview(&request)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiSuccess::ok(reply))
}

/// `POST /api/quick-answer`
pub async fn quick_answer(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiSuccess<QuickAnswer>>, ApiError> {
    let payload = parse_json(&state, body)?;
    let request = validate_quick_answer(&payload).map_err(|e| state.reject(e))?;
    let answer = state
        .engine
        .quick_answer(&request)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiSuccess::ok(answer))
}

/// `POST /api/tts`: raw mp3 on success.
pub async fn tts(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let payload = parse_json(&state, body)?;
    let request = validate_speech(&payload).map_err(|e| state.reject(e))?;
    let asset = state
        .engine
        .speak(&request)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        [
            (header::CONTENT_TYPE, asset.content_type()),
            (header::CACHE_CONTROL, "no-store"),
        ],
        asset.bytes,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: i64,
    pub speech_enabled: bool,
}

/// `GET /api/health`
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
        speech_enabled: state.engine.has_speech(),
    })
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// `GET /`
pub async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "prepwire",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "GET /api/health",
            "POST /api/real-interview",
            "POST /api/mock-interview",
            "POST /api/quick-answer",
            "POST /api/tts",
        ],
    })
}

pub async fn not_found() -> ApiError {
    ApiError::from(Error::NotFound)
}
