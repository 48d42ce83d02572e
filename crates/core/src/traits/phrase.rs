//! Narrow phrase-rendering capability
//!
//! The single entry point any language model gets into this runtime. It
//! phrases a step; it is never handed authority over `next_step_id`.

use async_trait::async_trait;

use crate::error::Result;

/// Render a step template into caller-facing text
#[async_trait]
pub trait PhraseRenderer: Send + Sync {
    async fn render(&self, template: &str, context: &serde_json::Value) -> Result<String>;
}
