//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Turn normalization: the API requires a leading user message and
//!   alternating roles, callers do not guarantee either

use async_trait::async_trait;
use prepwire_core::error::ProviderError;
use prepwire_core::message::{Role, Turn, Usage};
use prepwire_core::provider::{CompletionRequest, CompletionResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Inserted when a conversation opens with an assistant turn.
const CONVERSATION_OPENER: &str = "Hello, I'm ready to begin.";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with a transport-level timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert turns to the API's message list.
    ///
    /// Consecutive same-role turns are merged (joined by a blank line), empty
    /// turns dropped, and a short user opener is prepended when the history
    /// starts with the assistant. Relative order is never changed.
    fn to_api_messages(turns: &[Turn]) -> Vec<AnthropicMessage> {
        let mut result: Vec<AnthropicMessage> = Vec::with_capacity(turns.len() + 1);

        for turn in turns {
            if turn.content.trim().is_empty() {
                continue;
            }
            match result.last_mut() {
                Some(last) if last.role == turn.role.as_str() => {
                    last.content.push_str("\n\n");
                    last.content.push_str(&turn.content);
                }
                _ => result.push(AnthropicMessage {
                    role: turn.role.as_str(),
                    content: turn.content.clone(),
                }),
            }
        }

        if result.first().is_none_or(|m| m.role != Role::User.as_str()) {
            result.insert(
                0,
                AnthropicMessage {
                    role: Role::User.as_str(),
                    content: CONVERSATION_OPENER.into(),
                },
            );
        }

        result
    }

    /// Convert Anthropic API response to our CompletionResponse.
    fn to_completion_response(resp: AnthropicResponse) -> CompletionResponse {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        CompletionResponse {
            text,
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            },
            model: resp.model,
        }
    }

    fn retry_after(headers: &reqwest::header::HeaderMap) -> u64 {
        headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(5)
    }
}

#[async_trait]
impl prepwire_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let body = MessagesRequest {
            model: &request.model,
            system: &request.system,
            messages: Self::to_api_messages(&request.turns),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            provider = "anthropic",
            model = %request.model,
            turns = body.messages.len(),
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: Self::retry_after(response.headers()),
            });
        }
        if status == 529 {
            return Err(ProviderError::Overloaded);
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_body = prepwire_security::scrub(&error_body, &[self.api_key.clone()]);
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::ApiError {
                    status_code: status,
                    message: format!("Failed to parse Anthropic response: {e}"),
                })?;

        Ok(Self::to_completion_response(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
