//! Transport error types

use thiserror::Error;

/// Errors from the AudioSocket transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("frame error: {0}")]
    Frame(String),

    #[error("malformed uuid payload: {0}")]
    UuidPayload(String),

    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
