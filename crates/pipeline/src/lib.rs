//! Speech pipeline collaborators
//!
//! HTTP clients for the STT and TTS collaborators, the inactivity-window
//! turn detector, and the dual-track recording timeline. Scripted in-memory
//! doubles for STT and TTS live in [`testing`] so server integration tests
//! can run a full call without network collaborators.

pub mod error;
pub mod recording;
pub mod storage;
pub mod stt;
pub mod testing;
pub mod tts;
pub mod turn;

pub use error::{PipelineError, Result};
pub use recording::RecordingTimeline;
pub use storage::{HttpRecordingStorage, HttpStorageConfig};
pub use stt::{HttpStt, HttpSttConfig};
pub use tts::{HttpTts, HttpTtsConfig};
pub use turn::TurnDetector;
