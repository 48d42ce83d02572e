//! Core traits and types for the dhvani voice runtime
//!
//! This crate provides foundational types used across all other crates:
//! - PCM16 audio helpers (resampling, chunking, mixing)
//! - The persisted conversation record and its turn patch
//! - Language definitions
//! - Collaborator traits (STT, TTS, conversation store, recording storage,
//!   phrase rendering)
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod language;
pub mod traits;

pub use audio::SampleRate;
pub use conversation::{
    ConversationRecord, ConversationStatus, StepHistoryEntry, TurnPatch, STEP_HISTORY_LIMIT,
};
pub use error::{Error, Result};
pub use language::Language;

pub use traits::{
    ConversationStore, PhraseRenderer, RecordingHandle, RecordingStorage, SpeechToText, SttConfig,
    SttEvent, SttStream, TextToSpeech,
};
