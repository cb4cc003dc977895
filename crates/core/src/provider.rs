//! Provider trait: the abstraction over the chat-completion upstream.
//!
//! A Provider takes a system prompt plus the ordered conversation and returns
//! the generated text with token usage. Implementations: Anthropic Messages
//! API, the retry/timeout wrapper, and test stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{Turn, Usage};

/// A single chat-completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// System prompt, sent out-of-band from the turns
    pub system: String,

    /// The conversation, in caller order
    pub turns: Vec<Turn>,

    /// Generation budget for this call
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text, possibly empty
    pub text: String,

    pub usage: Usage,

    /// Which model actually responded
    pub model: String,
}

/// The chat-completion collaborator.
///
/// Constructed once at startup and shared behind an `Arc`; implementations
/// hold no request-specific mutable state.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;
}
