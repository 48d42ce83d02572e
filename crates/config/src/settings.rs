//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub turn: TurnConfig,

    #[serde(default)]
    pub stt: SttConfig,

    #[serde(default)]
    pub tts: TtsConfig,

    #[serde(default)]
    pub flows: FlowsConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub recording: RecordingConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Transport server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// AudioSocket TCP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP port for /health and /metrics
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    9093
}
fn default_health_port() -> u16 {
    8081
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            health_port: default_health_port(),
        }
    }
}

/// Outbound audio pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sleep between outbound 20ms frames. Slightly under the frame duration
    /// so scheduling jitter never starves the PBX jitter buffer.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
}

fn default_pace_ms() -> u64 {
    18
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            pace_ms: default_pace_ms(),
        }
    }
}

/// Turn detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Silence window after the last audio frame before a turn ends
    #[serde(default = "default_inactivity_ms")]
    pub inactivity_ms: u64,
}

fn default_inactivity_ms() -> u64 {
    1500
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            inactivity_ms: default_inactivity_ms(),
        }
    }
}

/// Speech-to-text collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default = "default_stt_url")]
    pub url: String,
    /// Default recognition language code
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub interim_results: bool,
    #[serde(default = "default_stt_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_stt_url() -> String {
    "http://127.0.0.1:8090".to_string()
}
fn default_language() -> String {
    "hi".to_string()
}
fn default_true() -> bool {
    true
}
fn default_stt_timeout_ms() -> u64 {
    10_000
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            url: default_stt_url(),
            language: default_language(),
            interim_results: default_true(),
            timeout_ms: default_stt_timeout_ms(),
        }
    }
}

/// Text-to-speech collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_url")]
    pub url: String,
    /// Voice id per language code
    #[serde(default = "default_voices")]
    pub voices: HashMap<String, String>,
    #[serde(default = "default_tts_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_tts_url() -> String {
    "http://127.0.0.1:8091".to_string()
}
fn default_voices() -> HashMap<String, String> {
    HashMap::from([
        ("hi".to_string(), "hi-riya".to_string()),
        ("en".to_string(), "en-asha".to_string()),
    ])
}
fn default_tts_timeout_ms() -> u64 {
    15_000
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: default_tts_url(),
            voices: default_voices(),
            timeout_ms: default_tts_timeout_ms(),
        }
    }
}

/// Flow graph loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowsConfig {
    /// Directory of flow JSON documents
    #[serde(default = "default_flows_dir")]
    pub dir: String,
    /// Flow used when the dialed number has no mapping
    #[serde(default = "default_flow")]
    pub default_flow: String,
    /// Dialed number -> flow id
    #[serde(default)]
    pub did_map: HashMap<String, String>,
}

fn default_flows_dir() -> String {
    "config/flows".to_string()
}
fn default_flow() -> String {
    "default".to_string()
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            dir: default_flows_dir(),
            default_flow: default_flow(),
            did_map: HashMap::new(),
        }
    }
}

/// Conversation behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Invalid answers tolerated per step before handoff
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    2
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

/// Call recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Durable storage upload endpoint; recording is skipped without one
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,
}

fn default_upload_timeout_ms() -> u64 {
    30_000
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            upload_url: None,
            upload_timeout_ms: default_upload_timeout_ms(),
        }
    }
}

/// Narrow LLM capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Disabled by default; the controller works without it
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_llm_url")]
    pub url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_llm_url() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_llm_model() -> String {
    "gemma2:2b".to_string()
}
fn default_llm_timeout_ms() -> u64 {
    5_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_llm_url(),
            model: default_llm_model(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        } else {
            builder = builder.add_source(File::with_name("config/default").required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("DHVANI")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.server.port == self.server.health_port {
            return Err(ConfigError::Invalid(
                "server.port and server.health_port must differ".into(),
            ));
        }
        if self.audio.pace_ms == 0 || self.audio.pace_ms > crate::constants::frame::FRAME_MS {
            return Err(ConfigError::Invalid(format!(
                "audio.pace_ms must be within (0, {}]",
                crate::constants::frame::FRAME_MS
            )));
        }
        if self.turn.inactivity_ms < 200 {
            return Err(ConfigError::Invalid(
                "turn.inactivity_ms below 200 would cut callers off mid-word".into(),
            ));
        }
        if self.flows.default_flow.is_empty() {
            return Err(ConfigError::Invalid("flows.default_flow must be set".into()));
        }
        Ok(())
    }
}
