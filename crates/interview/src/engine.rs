//! The interview engine: one method per endpoint.
//!
//! Built once at startup and shared behind an `Arc`. It holds no
//! per-conversation state; every call gets the full history from the
//! caller. Dropping a returned future cancels the upstream call in flight
//! and skips speech synthesis.

use std::sync::Arc;

use prepwire_config::AppConfig;
use prepwire_core::error::{Error, Result};
use prepwire_core::message::{Turn, Usage};
use prepwire_core::provider::{CompletionRequest, CompletionResponse, Provider};
use prepwire_core::speech::{SpeechAsset, SpeechProvider, Voice};
use prepwire_security::scrub;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::postprocess::{self, MAX_REPLY_CHARS, extract_feedback_block};
use crate::progress::{ProgressPolicy, classify};
use crate::prompt::{Persona, compose, seed_turns};
use crate::speech::{check_audio, speech_error, synthesize_best_effort};
use crate::text::truncate_chars;
use crate::validate::{InterviewRequest, QuickAnswerRequest, SpeechRequest};

/// Model parameters and limits used by the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model: String,
    pub temperature: f32,
    pub policy: ProgressPolicy,
    /// Max characters of a reply sent to inline speech.
    pub inline_speech_chars: usize,
    pub mock_max_tokens: u32,
    pub quick_answer_max_tokens: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            temperature: 0.7,
            policy: ProgressPolicy::default(),
            inline_speech_chars: 1000,
            mock_max_tokens: 600,
            quick_answer_max_tokens: 500,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            policy: ProgressPolicy::from(&config.interview),
            inline_speech_chars: config.interview.inline_speech_chars.min(MAX_REPLY_CHARS - 1),
            ..Self::default()
        }
    }
}

/// Reply to a real-interview turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewReply {
    pub message: String,
    pub contains_feedback: bool,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

/// Reply to a mock-interview turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockInterviewReply {
    pub message: String,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAnswer {
    pub answer: String,
    pub usage: Usage,
}

pub struct InterviewEngine {
    provider: Arc<dyn Provider>,
    speech: Option<Arc<dyn SpeechProvider>>,
    settings: EngineSettings,
    /// Known credentials, redacted from anything logged or returned.
    secrets: Vec<String>,
}

impl InterviewEngine {
    pub fn new(provider: Arc<dyn Provider>, settings: EngineSettings) -> Self {
        Self {
            provider,
            speech: None,
            settings,
            secrets: Vec::new(),
        }
    }

    pub fn with_speech(mut self, speech: Option<Arc<dyn SpeechProvider>>) -> Self {
        self.speech = speech;
        self
    }

    pub fn with_secrets(mut self, secrets: Vec<String>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn has_speech(&self) -> bool {
        self.speech.is_some()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// One turn of a formal interview.
    pub async fn real_interview(&self, request: &InterviewRequest) -> Result<InterviewReply> {
        let progress = classify(&request.messages, &self.settings.policy);
        let system = compose(Persona::RealInterview, &request.context, Some(&progress));
        let turns = seed_turns(&request.messages, &request.context.job_title);

        info!(
            endpoint = "real-interview",
            tier = progress.tier.as_str(),
            user_turns = progress.user_turns,
            max_tokens = progress.max_tokens,
            "Interview turn"
        );

        let response = self
            .complete("real-interview", system, turns, progress.max_tokens)
            .await?;
        let processed = postprocess::postprocess(&response.text);

        if processed.contains_feedback {
            info!(
                endpoint = "real-interview",
                feedback_chars = extract_feedback_block(&processed.text)
                    .map(|b| b.chars().count())
                    .unwrap_or(0),
                expected = progress.expects_feedback,
                "Interview concluded with feedback"
            );
        } else if processed.truncated {
            debug!(endpoint = "real-interview", "Reply trimmed to a single question");
        }

        // The feedback screen is read, not listened to.
        let audio_base64 = match request.voice {
            Some(voice) if !processed.contains_feedback => {
                self.inline_audio(&processed.text, voice).await
            }
            _ => None,
        };

        info!(
            endpoint = "real-interview",
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            truncated = processed.truncated,
            contains_feedback = processed.contains_feedback,
            audio = audio_base64.is_some(),
            "Interview reply ready"
        );

        Ok(InterviewReply {
            message: processed.text,
            contains_feedback: processed.contains_feedback,
            usage: response.usage,
            audio_base64,
        })
    }

    /// One turn of a practice interview with per-answer coaching.
    pub async fn mock_interview(&self, request: &InterviewRequest) -> Result<MockInterviewReply> {
        let system = compose(Persona::MockInterview, &request.context, None);
        let max_tokens = self.settings.mock_max_tokens;

        let response = self
            .complete("mock-interview", system, request.messages.clone(), max_tokens)
            .await?;
        let processed = postprocess::postprocess(&response.text);

        let audio_base64 = match request.voice {
            Some(voice) => self.inline_audio(&processed.text, voice).await,
            None => None,
        };

        info!(
            endpoint = "mock-interview",
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            truncated = processed.truncated,
            audio = audio_base64.is_some(),
            "Mock interview reply ready"
        );

        Ok(MockInterviewReply {
            message: processed.text,
            usage: response.usage,
            audio_base64,
        })
    }

    /// A model answer to a single interview question.
    pub async fn quick_answer(&self, request: &QuickAnswerRequest) -> Result<QuickAnswer> {
        let system = compose(Persona::QuickAnswer, &request.context, None);
        let turns = vec![Turn::user(format!("Interview question: {}", request.question))];

        let response = self
            .complete(
                "quick-answer",
                system,
                turns,
                self.settings.quick_answer_max_tokens,
            )
            .await?;

        info!(
            endpoint = "quick-answer",
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            "Quick answer ready"
        );

        Ok(QuickAnswer {
            answer: truncate_chars(response.text.trim(), MAX_REPLY_CHARS).to_string(),
            usage: response.usage,
        })
    }

    /// Synthesize standalone speech. Unlike inline audio, failures surface.
    pub async fn speak(&self, request: &SpeechRequest) -> Result<SpeechAsset> {
        let speech = self.speech.as_ref().ok_or_else(|| {
            Error::UpstreamUnavailable("Speech synthesis is not configured".into())
        })?;

        let bytes = speech
            .synthesize(&request.text, request.voice)
            .await
            .map_err(|e| {
                let err = speech_error(e, &self.secrets);
                warn!(
                    endpoint = "tts",
                    provider = speech.name(),
                    error = %err.public_message(),
                    detail = err.detail().unwrap_or(""),
                    "Speech synthesis failed"
                );
                err
            })
            .and_then(check_audio)?;

        info!(
            endpoint = "tts",
            voice = %request.voice,
            chars = request.text.chars().count(),
            bytes = bytes.len(),
            "Speech ready"
        );

        Ok(SpeechAsset::mp3(bytes))
    }

    async fn inline_audio(&self, text: &str, voice: Voice) -> Option<String> {
        synthesize_best_effort(
            self.speech.as_deref(),
            text,
            voice,
            self.settings.inline_speech_chars,
            &self.secrets,
        )
        .await
    }

    /// Call the chat upstream and reject blank completions.
    async fn complete(
        &self,
        endpoint: &'static str,
        system: String,
        turns: Vec<Turn>,
        max_tokens: u32,
    ) -> Result<CompletionResponse> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system,
            turns,
            max_tokens,
            temperature: self.settings.temperature,
        };

        let response = self.provider.complete(request).await.map_err(|e| {
            let err = match Error::from(e) {
                Error::UpstreamUnavailable(detail) => {
                    Error::UpstreamUnavailable(scrub(&detail, &self.secrets))
                }
                other => other,
            };
            warn!(
                endpoint,
                provider = self.provider.name(),
                error = %err.public_message(),
                detail = err.detail().unwrap_or(""),
                "Chat completion failed"
            );
            err
        })?;

        if response.text.trim().is_empty() {
            warn!(endpoint, provider = self.provider.name(), "Chat upstream returned empty text");
            return Err(Error::EmptyUpstreamResponse);
        }

        Ok(response)
    }
}
