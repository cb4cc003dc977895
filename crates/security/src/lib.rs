//! Security helpers for Prepwire: secret scrubbing and shared-secret checks.
//!
//! Provides:
//! - **Secrets**: Redact API keys and credential-shaped tokens from any text
//!   before it reaches a log line or an error body
//! - **Shared secret**: Constant-time verification of the static client secret

pub mod secrets;
pub mod shared_secret;

pub use secrets::{contains_secret, scrub, REDACTED};
pub use shared_secret::SharedSecret;
