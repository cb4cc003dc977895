//! Post-processing of raw model output.
//!
//! Two jobs: detect the concluding feedback block, and hold the interviewer
//! to one question per turn when the model lists several anyway.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::text::truncate_chars;

pub const FEEDBACK_START_MARKER: &str = "===FEEDBACK_START===";
pub const FEEDBACK_END_MARKER: &str = "===FEEDBACK_END===";

/// Upper bound on a conversational reply.
pub const MAX_REPLY_CHARS: usize = 10_000;

static FIRST_ITEM: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*1[.)]\s").ok());

static SECOND_ITEM: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*2[.)]\s").ok());

/// Result of post-processing one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub text: String,
    pub contains_feedback: bool,
    /// Extra questions were cut or the reply was capped.
    pub truncated: bool,
}

pub fn contains_feedback(raw: &str) -> bool {
    raw.contains(FEEDBACK_START_MARKER)
}

/// Byte offset of the line starting item `2.` when a numbered list is present.
fn second_item_start(raw: &str) -> Option<usize> {
    let first = FIRST_ITEM.as_ref()?.find(raw)?;
    SECOND_ITEM
        .as_ref()?
        .find_at(raw, first.end())
        .map(|m| m.start())
}

/// Whether the reply lists numbered questions (`1.` ... `2.` at line starts).
///
/// Prose such as "Step 1 ... Step 2" is not caught.
pub fn has_multiple_numbered_questions(raw: &str) -> bool {
    second_item_start(raw).is_some()
}

/// Keep only the first numbered question.
pub fn enforce_single_question(raw: &str) -> Cow<'_, str> {
    match second_item_start(raw) {
        Some(cut) => Cow::Owned(raw[..cut].trim_end().to_string()),
        None => Cow::Borrowed(raw),
    }
}

/// Apply the feedback check, single-question enforcement and the length cap.
///
/// Replies carrying feedback are returned verbatim: the block itself is a
/// numbered list and must reach the client intact.
pub fn postprocess(raw: &str) -> Processed {
    if contains_feedback(raw) {
        return Processed {
            text: raw.to_string(),
            contains_feedback: true,
            truncated: false,
        };
    }

    let single = enforce_single_question(raw);
    let mut truncated = matches!(single, Cow::Owned(_));

    let capped = truncate_chars(&single, MAX_REPLY_CHARS);
    if capped.len() < single.len() {
        truncated = true;
    }

    Processed {
        text: capped.to_string(),
        contains_feedback: false,
        truncated,
    }
}

/// Text between the feedback markers, trimmed. A missing end marker runs
/// the block to the end of the reply.
pub fn extract_feedback_block(raw: &str) -> Option<&str> {
    let start = raw.find(FEEDBACK_START_MARKER)? + FEEDBACK_START_MARKER.len();
    let rest = &raw[start..];
    let block = match rest.find(FEEDBACK_END_MARKER) {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(block.trim())
}
