//! Narrow language-model capabilities
//!
//! The model gets exactly two jobs here and no authority over dialog state:
//! phrasing a step template ([`render::OllamaPhraseRenderer`]) and a
//! fallback intent guess validated against a closed label set
//! ([`fallback::IntentFallback`]). Neither is ever consulted for
//! `next_step_id`.

pub mod fallback;
pub mod render;

pub use fallback::IntentFallback;
pub use render::{OllamaPhraseRenderer, RendererConfig};

use thiserror::Error;

/// LLM capability errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("empty completion")]
    EmptyCompletion,
}
