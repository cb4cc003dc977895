//! Request payload validation and sanitization.
//!
//! Every endpoint validates the raw JSON body here before any upstream call.
//! Validation is pure: no I/O and no logging of field contents. Fields that
//! end up inside the system prompt are sanitized so a caller cannot smuggle
//! line breaks (and with them fake prompt sections) into it.

use prepwire_core::error::{Error, Result};
use prepwire_core::message::{Role, Turn};
use prepwire_core::speech::Voice;
use serde_json::Value;

use crate::prompt::InterviewContext;
use crate::text::{char_len, truncate_chars};

pub const MAX_JOB_TITLE_CHARS: usize = 200;
pub const MAX_CONTEXT_FIELD_CHARS: usize = 200;
pub const MAX_MESSAGES: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 10_000;
pub const MAX_QUESTION_CHARS: usize = 2_000;
pub const MAX_SPEECH_TEXT_CHARS: usize = 4_096;

pub const DEFAULT_INDUSTRY: &str = "General";
pub const DEFAULT_EXPERIENCE_LEVEL: &str = "Mid-level";
pub const DEFAULT_INTERVIEW_TYPE: &str = "Behavioral and Technical";
pub const DEFAULT_QUICK_ANSWER_ROLE: &str = "Professional";

const JOB_TITLE_ERROR: &str = "Job title is required (max 200 characters)";
const MESSAGES_FORMAT_ERROR: &str = "Invalid messages format";
const MESSAGES_REQUIRED_ERROR: &str = "Messages are required";
const QUESTION_ERROR: &str = "Question is required (max 2000 characters)";
const TEXT_ERROR: &str = "Text is required (max 4096 characters)";
const VOICE_ERROR: &str = "Unsupported voice";

/// A validated interview request (real or mock).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewRequest {
    pub messages: Vec<Turn>,
    pub context: InterviewContext,
    /// Inline audio voice, when the caller asked for audio.
    pub voice: Option<Voice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickAnswerRequest {
    pub question: String,
    pub context: InterviewContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Voice,
}

/// Replace control characters with spaces, collapse whitespace runs and trim.
pub fn sanitize_input(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`sanitize_input`], then cap at `max_chars` on a character boundary.
pub fn sanitize_field(raw: &str, max_chars: usize) -> String {
    let clean = sanitize_input(raw);
    truncate_chars(&clean, max_chars).trim_end().to_string()
}

fn string_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

/// Optional context field: sanitized and capped, with a fallback for
/// absent, non-string or blank values.
fn context_field(payload: &Value, key: &str, default: &str) -> String {
    string_field(payload, key)
        .map(|raw| sanitize_field(raw, MAX_CONTEXT_FIELD_CHARS))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Required free-text field. The cap applies to the raw (trimmed) value, so
/// padding that sanitizing would collapse still counts against it.
fn required_text(payload: &Value, key: &str, max_chars: usize) -> Option<String> {
    let raw = string_field(payload, key)?.trim();
    if char_len(raw) > max_chars {
        return None;
    }
    Some(sanitize_input(raw)).filter(|clean| !clean.is_empty())
}

fn job_title(payload: &Value) -> Result<String> {
    required_text(payload, "jobTitle", MAX_JOB_TITLE_CHARS)
        .ok_or_else(|| Error::InvalidInput(JOB_TITLE_ERROR.into()))
}

fn messages(payload: &Value) -> Result<Vec<Turn>> {
    let items = match payload.get("messages") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(Error::InvalidInput(MESSAGES_FORMAT_ERROR.into())),
    };
    if items.len() > MAX_MESSAGES {
        return Err(Error::InvalidInput(MESSAGES_FORMAT_ERROR.into()));
    }

    items
        .iter()
        .map(|item| {
            let content = item
                .as_object()
                .and_then(|obj| obj.get("content"))
                .and_then(Value::as_str)
                .filter(|c| char_len(c) <= MAX_MESSAGE_CHARS)
                .ok_or_else(|| Error::InvalidInput(MESSAGES_FORMAT_ERROR.into()))?;
            let role = item
                .get("role")
                .and_then(Value::as_str)
                .map(Role::from_wire)
                .unwrap_or(Role::Assistant);
            Ok(Turn {
                role,
                content: content.to_string(),
            })
        })
        .collect()
}

/// Inline audio voice: unknown names fall back to the default.
fn inline_voice(payload: &Value) -> Option<Voice> {
    string_field(payload, "voice")
        .filter(|v| !v.trim().is_empty())
        .map(|v| Voice::parse(v).unwrap_or(Voice::DEFAULT))
}

/// Validate a real-interview payload. An absent history starts a new interview.
pub fn validate_interview(payload: &Value) -> Result<InterviewRequest> {
    let job_title = job_title(payload)?;
    let messages = messages(payload)?;

    Ok(InterviewRequest {
        messages,
        context: InterviewContext {
            job_title,
            industry: context_field(payload, "industry", DEFAULT_INDUSTRY),
            experience_level: Some(context_field(
                payload,
                "experienceLevel",
                DEFAULT_EXPERIENCE_LEVEL,
            )),
            interview_type: Some(context_field(
                payload,
                "interviewType",
                DEFAULT_INTERVIEW_TYPE,
            )),
        },
        voice: inline_voice(payload),
    })
}

/// Validate a mock-interview payload. The history must be non-empty.
pub fn validate_mock_interview(payload: &Value) -> Result<InterviewRequest> {
    let job_title = job_title(payload)?;
    let messages = messages(payload)?;
    if messages.is_empty() {
        return Err(Error::InvalidInput(MESSAGES_REQUIRED_ERROR.into()));
    }

    Ok(InterviewRequest {
        messages,
        context: InterviewContext {
            job_title,
            industry: context_field(payload, "industry", DEFAULT_INDUSTRY),
            experience_level: Some(context_field(
                payload,
                "experienceLevel",
                DEFAULT_EXPERIENCE_LEVEL,
            )),
            interview_type: None,
        },
        voice: inline_voice(payload),
    })
}

pub fn validate_quick_answer(payload: &Value) -> Result<QuickAnswerRequest> {
    let question = required_text(payload, "question", MAX_QUESTION_CHARS)
        .ok_or_else(|| Error::InvalidInput(QUESTION_ERROR.into()))?;

    Ok(QuickAnswerRequest {
        question,
        context: InterviewContext {
            job_title: context_field(payload, "jobTitle", DEFAULT_QUICK_ANSWER_ROLE),
            industry: context_field(payload, "industry", DEFAULT_INDUSTRY),
            experience_level: None,
            interview_type: None,
        },
    })
}

/// Validate a speech payload. Unlike inline audio, an unknown voice is an error.
pub fn validate_speech(payload: &Value) -> Result<SpeechRequest> {
    let text = string_field(payload, "text").map(str::trim).unwrap_or("");
    if text.is_empty() || char_len(text) > MAX_SPEECH_TEXT_CHARS {
        return Err(Error::InvalidInput(TEXT_ERROR.into()));
    }

    let voice = match payload.get("voice") {
        None | Some(Value::Null) => Voice::DEFAULT,
        Some(value) => value
            .as_str()
            .and_then(Voice::parse)
            .ok_or_else(|| Error::InvalidInput(VOICE_ERROR.into()))?,
    };

    Ok(SpeechRequest {
        text: text.to_string(),
        voice,
    })
}
