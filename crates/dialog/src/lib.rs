//! Flow graphs and the dialog state controller
//!
//! A flow graph is a declarative step graph loaded from JSON. The controller
//! is a pure function over `(flow, conversation record, utterance)`: all
//! mutable state lives in the record passed in, and each turn returns a
//! [`dhvani_core::TurnPatch`] delta. That makes the controller safe to call
//! concurrently from any number of call sessions and makes restart-safety a
//! property of the store, not of this crate.

pub mod controller;
pub mod error;
pub mod graph;
pub mod loader;

pub use controller::DialogController;
pub use error::{DialogError, Result};
pub use graph::{FlowGraph, FlowIntentDef, Step, StepKind};
pub use loader::{FlowRepository, FlowStore};
