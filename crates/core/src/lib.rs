//! # Prepwire Core
//!
//! Domain types, collaborator traits, and error definitions for the Prepwire
//! interview gateway. This crate has **zero framework dependencies**. It
//! defines the model that the interview pipeline, the upstream providers and
//! the HTTP gateway all build against.
//!
//! ## Design Philosophy
//!
//! Both upstream services (chat completion and speech synthesis) are traits
//! here. Implementations live in `prepwire-providers`. This enables:
//! - Constructing the clients once and sharing them read-only across requests
//! - Stubbing upstreams in tests (spies that count calls, failing synthesizers)
//! - A clean dependency graph (every crate depends inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod speech;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result};
pub use message::{Role, Turn, Usage};
pub use provider::{CompletionRequest, CompletionResponse, Provider};
pub use speech::{SpeechAsset, SpeechProvider, Voice};
