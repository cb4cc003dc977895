//! Speech synthesis collaborator and the closed voice set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Voices the speech upstream accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl Voice {
    /// Voice used when a request names none (or, for inline audio, an unknown one).
    pub const DEFAULT: Voice = Voice::Nova;

    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    /// Parse a caller-supplied identifier. Case-insensitive, surrounding
    /// whitespace ignored.
    pub fn parse(value: &str) -> Option<Voice> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesized audio. Lives for one request-response cycle only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAsset {
    pub bytes: Vec<u8>,
    pub encoding: &'static str,
}

impl SpeechAsset {
    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            encoding: "mp3",
        }
    }

    pub fn content_type(&self) -> &'static str {
        "audio/mpeg"
    }
}

/// The text-to-speech collaborator.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesize `text` with `voice`, returning mp3 bytes.
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>, ProviderError>;
}
