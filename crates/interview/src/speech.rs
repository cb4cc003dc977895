//! Speech synthesis for replies.
//!
//! Inline audio is best effort: the text reply is the product, audio is an
//! optional extra. Any failure collapses to "no audio" and is only logged.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use prepwire_core::error::{Error, ProviderError};
use prepwire_core::speech::{SpeechProvider, Voice};
use prepwire_security::scrub;
use tracing::{debug, warn};

use crate::text::truncate_chars;

/// Largest audio payload passed back to a caller.
pub const MAX_AUDIO_BYTES: usize = 5 * 1024 * 1024;

/// Reject empty or oversized audio.
pub fn check_audio(bytes: Vec<u8>) -> Result<Vec<u8>, Error> {
    if bytes.is_empty() {
        return Err(Error::EmptyUpstreamResponse);
    }
    if bytes.len() > MAX_AUDIO_BYTES {
        return Err(Error::BadUpstreamResponse(format!(
            "speech audio is {} bytes (limit {MAX_AUDIO_BYTES})",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Synthesize `text` and return it base64-encoded, or `None` on any failure.
///
/// Text longer than `max_chars` is cut on a character boundary first.
pub async fn synthesize_best_effort(
    speech: Option<&dyn SpeechProvider>,
    text: &str,
    voice: Voice,
    max_chars: usize,
    secrets: &[String],
) -> Option<String> {
    let speech = speech?;
    let input = truncate_chars(text.trim(), max_chars);
    if input.is_empty() {
        return None;
    }

    let outcome = speech
        .synthesize(input, voice)
        .await
        .map_err(Error::from)
        .and_then(check_audio);

    match outcome {
        Ok(bytes) => {
            debug!(voice = %voice, bytes = bytes.len(), "Inline speech synthesized");
            Some(STANDARD.encode(bytes))
        }
        Err(e) => {
            let detail = e.detail().map(|d| scrub(d, secrets));
            warn!(
                provider = speech.name(),
                error = %e.public_message(),
                detail = detail.as_deref().unwrap_or(""),
                "Inline speech failed, replying without audio"
            );
            None
        }
    }
}

/// Map a speech failure for the dedicated TTS endpoint.
pub(crate) fn speech_error(err: ProviderError, secrets: &[String]) -> Error {
    match Error::from(err) {
        Error::UpstreamUnavailable(detail) => Error::UpstreamUnavailable(scrub(&detail, secrets)),
        other => other,
    }
}
