//! Error types for the Prepwire domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! `ProviderError` describes what went wrong talking to an upstream;
//! `Error` is the caller-facing taxonomy every endpoint maps onto.

use thiserror::Error;

/// The caller-facing error type for all Prepwire operations.
///
/// Each variant corresponds to exactly one HTTP status (see [`Error::status_code`]).
#[derive(Debug, Error)]
pub enum Error {
    /// The request payload failed validation. Detected before any upstream call.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing or incorrect shared secret.
    #[error("Unauthorized")]
    Unauthorized,

    /// The upstream model signalled rate limiting or overload.
    #[error("The AI service is busy, please retry shortly")]
    UpstreamOverloaded,

    /// The upstream call succeeded but produced no usable content.
    #[error("The AI service returned an empty response, please retry")]
    EmptyUpstreamResponse,

    /// The upstream answered with content that cannot be used (e.g. oversized audio).
    #[error("The AI service returned an unusable response")]
    BadUpstreamResponse(String),

    /// The upstream could not be reached or failed outright.
    #[error("The AI service is unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Not found")]
    NotFound,

    /// The handler-level deadline elapsed.
    #[error("Request timed out")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::Unauthorized => 401,
            Error::NotFound => 404,
            Error::Timeout => 408,
            Error::UpstreamOverloaded => 429,
            Error::EmptyUpstreamResponse | Error::BadUpstreamResponse(_) => 502,
            Error::UpstreamUnavailable(_) | Error::Internal(_) => 500,
        }
    }

    /// Short, user-visible message. Never carries upstream error text.
    pub fn public_message(&self) -> String {
        match self {
            Error::UpstreamUnavailable(_) => "The AI service is unavailable".into(),
            Error::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }

    /// Internal detail for non-production diagnostics, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::UpstreamUnavailable(detail)
            | Error::BadUpstreamResponse(detail)
            | Error::Internal(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by an upstream collaborator (chat or speech).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider is overloaded")]
    Overloaded,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether a retry at the transport layer might succeed.
    ///
    /// Rate limiting is not transient here: the caller receives the 429.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) | ProviderError::Overloaded => {
                true
            }
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { .. } | ProviderError::Overloaded => {
                Error::UpstreamOverloaded
            }
            ProviderError::EmptyResponse => Error::EmptyUpstreamResponse,
            other => Error::UpstreamUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(Error::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(Error::Unauthorized.status_code(), 401);
        assert_eq!(Error::NotFound.status_code(), 404);
        assert_eq!(Error::Timeout.status_code(), 408);
        assert_eq!(Error::UpstreamOverloaded.status_code(), 429);
        assert_eq!(Error::EmptyUpstreamResponse.status_code(), 502);
        assert_eq!(Error::BadUpstreamResponse("x".into()).status_code(), 502);
        assert_eq!(Error::UpstreamUnavailable("x".into()).status_code(), 500);
    }

    #[test]
    fn rate_limit_maps_to_overloaded() {
        let err: Error = ProviderError::RateLimited { retry_after_secs: 3 }.into();
        assert!(matches!(err, Error::UpstreamOverloaded));
        let err: Error = ProviderError::Overloaded.into();
        assert!(matches!(err, Error::UpstreamOverloaded));
    }

    #[test]
    fn empty_response_maps_to_502() {
        let err: Error = ProviderError::EmptyResponse.into();
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn public_message_hides_upstream_detail() {
        let err: Error = ProviderError::Network("connection reset by 10.0.0.3".into()).into();
        assert!(!err.public_message().contains("10.0.0.3"));
        assert!(err.detail().unwrap().contains("10.0.0.3"));
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(ProviderError::Timeout("30s".into()).is_transient());
        assert!(ProviderError::Overloaded.is_transient());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!ProviderError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_transient());
    }
}
