//! Error types shared across the runtime

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("speech-to-text error: {0}")]
    Stt(String),

    #[error("text-to-speech error: {0}")]
    Tts(String),

    #[error("conversation store error: {0}")]
    Store(String),

    #[error("recording storage error: {0}")]
    Storage(String),

    #[error("phrase rendering error: {0}")]
    Render(String),

    #[error("conversation not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias using the core error type
pub type Result<T> = std::result::Result<T, Error>;
