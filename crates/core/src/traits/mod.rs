//! Collaborator traits
//!
//! Seams to everything the runtime consumes but does not implement: speech
//! recognition and synthesis, the durable conversation store, recording
//! storage, and the narrow phrase-rendering capability.

pub mod phrase;
pub mod speech;
pub mod storage;
pub mod store;

pub use phrase::PhraseRenderer;
pub use speech::{SpeechToText, SttConfig, SttEvent, SttStream, TextToSpeech};
pub use storage::{RecordingHandle, RecordingStorage};
pub use store::ConversationStore;
