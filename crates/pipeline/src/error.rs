//! Pipeline error types

use thiserror::Error;

/// Errors internal to pipeline collaborator clients
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stt request failed: {0}")]
    Stt(String),

    #[error("tts request failed: {0}")]
    Tts(String),

    #[error("recording encode failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
