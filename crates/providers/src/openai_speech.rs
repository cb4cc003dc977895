//! OpenAI text-to-speech provider.
//!
//! Converts text to MP3 audio via `POST /v1/audio/speech`.

use async_trait::async_trait;
use prepwire_core::error::ProviderError;
use prepwire_core::speech::Voice;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "tts-1";

/// OpenAI `/audio/speech` provider.
pub struct OpenAiSpeechProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiSpeechProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'static str,
    response_format: &'static str,
}

#[async_trait]
impl prepwire_core::SpeechProvider for OpenAiSpeechProvider {
    fn name(&self) -> &str {
        "openai-tts"
    }

    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/audio/speech", self.base_url);
        let body = SpeechBody {
            model: &self.model,
            input: text,
            voice: voice.as_str(),
            response_format: "mp3",
        };

        debug!(provider = "openai-tts", voice = %voice, chars = text.chars().count(), "Sending speech request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid OpenAI API key".into(),
            ));
        }
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_body = prepwire_security::scrub(&error_body, &[self.api_key.clone()]);
            warn!(status, body = %error_body, "OpenAI speech API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(format!("Speech response read failed: {e}")))?;

        Ok(bytes.to_vec())
    }
}
