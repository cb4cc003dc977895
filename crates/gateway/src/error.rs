//! JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use prepwire_core::Error;
use prepwire_security::scrub;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// An error on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                success: false,
                error: message.into(),
                details: None,
            },
        }
    }

    /// Render a pipeline error. Upstream detail is attached only when
    /// `expose_details` is set, and is scrubbed either way.
    pub fn from_error(err: &Error, expose_details: bool, secrets: &[String]) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let details = if expose_details {
            err.detail().map(|d| scrub(d, secrets))
        } else {
            None
        };

        Self {
            status,
            body: ErrorResponse {
                success: false,
                error: err.public_message(),
                details,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::from_error(&err, false, &[])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
