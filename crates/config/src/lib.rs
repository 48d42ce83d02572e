//! Runtime configuration
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! `DHVANI__`-prefixed environment variables (`DHVANI__SERVER__PORT=9093`
//! overrides `server.port`). Fixed protocol numbers that are not tunable live
//! in [`constants`].

pub mod constants;
pub mod settings;

pub use settings::{
    AudioConfig, ConversationConfig, FlowsConfig, LlmConfig, RecordingConfig, ServerConfig,
    Settings, SttConfig, TtsConfig, TurnConfig,
};

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
