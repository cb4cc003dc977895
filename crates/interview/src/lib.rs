//! # Prepwire Interview
//!
//! The request pipeline behind every interview endpoint:
//!
//! ```text
//! payload ─▶ validate ─▶ progress::classify ─▶ prompt::compose
//!                                                    │
//!        reply ◀─ speech (best effort) ◀─ postprocess ◀─ provider.complete
//! ```
//!
//! Everything except [`InterviewEngine`] is pure. The engine owns the
//! upstream handles and is shared read-only across requests.

pub mod engine;
pub mod postprocess;
pub mod progress;
pub mod prompt;
pub mod speech;
pub mod text;
pub mod validate;

pub use engine::{EngineSettings, InterviewEngine, InterviewReply, MockInterviewReply, QuickAnswer};
pub use postprocess::{FEEDBACK_END_MARKER, FEEDBACK_START_MARKER, MAX_REPLY_CHARS, Processed};
pub use progress::{Progress, ProgressPolicy, Tier};
pub use prompt::{InterviewContext, Persona};
pub use validate::{InterviewRequest, QuickAnswerRequest, SpeechRequest};
