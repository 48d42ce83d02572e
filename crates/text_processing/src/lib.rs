//! Text processing for the dhvani voice runtime
//!
//! Four layers that sit between a raw STT transcript and the dialog
//! controller, plus one that sits between the controller and TTS:
//!
//! - [`digits`]: spoken-digit translation, run before any pattern matching
//! - [`extract`]: per-field slot extraction (strict and opportunistic modes)
//! - [`validate`]: post-validators stricter than the extraction regexes
//! - [`intent`]: keyword-table classification for flow selection/interrupts
//! - [`normalize`]: number/currency verbalization for TTS pronunciation

pub mod digits;
pub mod extract;
pub mod intent;
pub mod normalize;
pub mod validate;

pub use extract::{FieldType, SlotExtractor};
pub use intent::{Classification, Confirmation, IntentClassifier, IntentDef};
pub use normalize::Verbalizer;
pub use validate::{validate, ValidationFailure};
