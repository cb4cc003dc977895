//! Upstream construction: builds the chat and speech clients from config.
//!
//! Both are created once at startup, wrapped in the retry layer, and shared
//! read-only by every request handler.

use std::sync::Arc;
use std::time::Duration;

use prepwire_config::{AppConfig, ConfigError};
use prepwire_core::provider::Provider;
use prepwire_core::speech::SpeechProvider;
use tracing::{info, warn};

use crate::anthropic::AnthropicProvider;
use crate::openai_speech::OpenAiSpeechProvider;
use crate::retry::{RetryPolicy, RetryingProvider, RetryingSpeechProvider};

/// The configured upstream collaborators.
#[derive(Clone)]
pub struct Upstreams {
    pub chat: Arc<dyn Provider>,
    /// `None` when no speech key is configured.
    pub speech: Option<Arc<dyn SpeechProvider>>,
}

/// Retry policy derived from `[upstream]`.
pub fn retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_secs(config.upstream.timeout_secs),
        max_retries: config.upstream.max_retries,
        ..RetryPolicy::default()
    }
}

/// Build providers from configuration.
///
/// A chat key is mandatory; a missing speech key only disables audio.
pub fn build_from_config(config: &AppConfig) -> Result<Upstreams, ConfigError> {
    let policy = retry_policy(config);
    // The per-attempt bound lives in the retry layer; the client timeout is a backstop.
    let client_timeout = policy.timeout + Duration::from_secs(5);

    let api_key = config
        .upstream
        .anthropic_api_key
        .as_deref()
        .ok_or_else(|| {
            ConfigError::MissingCredential(
                "Anthropic API key (set ANTHROPIC_API_KEY or upstream.anthropic_api_key)".into(),
            )
        })?;

    let mut anthropic = AnthropicProvider::new(api_key, client_timeout)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    if let Some(base_url) = &config.upstream.anthropic_base_url {
        anthropic = anthropic.with_base_url(base_url);
    }
    let chat: Arc<dyn Provider> = Arc::new(RetryingProvider::new(Arc::new(anthropic), policy.clone()));

    let speech: Option<Arc<dyn SpeechProvider>> = match &config.upstream.openai_api_key {
        Some(key) => {
            let mut openai = OpenAiSpeechProvider::new(key, client_timeout)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?
                .with_model(&config.upstream.tts_model);
            if let Some(base_url) = &config.upstream.openai_base_url {
                openai = openai.with_base_url(base_url);
            }
            Some(Arc::new(RetryingSpeechProvider::new(Arc::new(openai), policy)))
        }
        None => {
            warn!("No OpenAI API key configured; speech synthesis disabled");
            None
        }
    };

    info!(
        chat = chat.name(),
        speech = speech.as_ref().map(|s| s.name()).unwrap_or("disabled"),
        timeout_secs = config.upstream.timeout_secs,
        max_retries = config.upstream.max_retries,
        "Upstreams configured"
    );

    Ok(Upstreams { chat, speech })
}
