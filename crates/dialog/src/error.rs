//! Dialog error types

use thiserror::Error;

/// Errors from flow loading and turn processing
#[derive(Debug, Error)]
pub enum DialogError {
    #[error("unknown flow: {0}")]
    UnknownFlow(String),

    #[error("unknown step {step} in flow {flow}")]
    UnknownStep { flow: String, step: String },

    #[error("invalid flow {flow}: {reason}")]
    InvalidFlow { flow: String, reason: String },

    #[error("conversation is already terminal")]
    ConversationClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DialogError>;
