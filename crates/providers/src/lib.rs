//! Upstream provider implementations for Prepwire.
//!
//! The chat provider implements `prepwire_core::Provider`, the speech
//! provider implements `prepwire_core::SpeechProvider`. Both are wrapped in
//! a retry/timeout layer and built once from configuration.

pub mod anthropic;
pub mod openai_speech;
pub mod retry;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_speech::OpenAiSpeechProvider;
pub use retry::{RetryPolicy, RetryingProvider, RetryingSpeechProvider};
pub use router::{Upstreams, build_from_config};
