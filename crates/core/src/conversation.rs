//! Conversation record and turn patch
//!
//! The record is the single source of truth for a conversation. It lives in
//! the external store and is mutated exactly once per turn by applying a
//! [`TurnPatch`], never overwritten wholesale. The patch carries only the
//! delta a turn learned, so a replayed or concurrent turn cannot erase
//! previously collected data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::language::Language;

/// Upper bound on retained step-history entries
pub const STEP_HISTORY_LIMIT: usize = 50;

/// Lifecycle status of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Active,
    Completed,
    Handoff,
    Abandoned,
}

impl ConversationStatus {
    /// Terminal statuses accept no further turns
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConversationStatus::Active)
    }
}

/// One visited step, retained in bounded history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepHistoryEntry {
    pub step_id: String,
    pub at: DateTime<Utc>,
}

/// Persisted conversation state, externally stored, one per call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Store id
    pub id: String,
    /// Call this conversation belongs to
    pub call_id: String,
    /// Flow driving the conversation
    pub flow_id: String,
    /// Step the next turn executes
    pub current_step_id: String,
    /// Step the previous turn executed
    pub previous_step_id: Option<String>,
    /// Collected field values, keys unique
    pub collected_data: HashMap<String, String>,
    /// Consecutive failed attempts at the current step
    pub retry_count: u32,
    /// Retries allowed before escalation to handoff
    pub max_retries: u32,
    pub status: ConversationStatus,
    pub language: Language,
    /// Last [`STEP_HISTORY_LIMIT`] visited steps
    pub step_history: Vec<StepHistoryEntry>,
    /// Channel metadata
    pub caller_number: Option<String>,
    pub called_number: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    /// Create a fresh record positioned at a flow's start step
    pub fn new(
        call_id: impl Into<String>,
        flow_id: impl Into<String>,
        start_step_id: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            flow_id: flow_id.into(),
            current_step_id: start_step_id.into(),
            previous_step_id: None,
            collected_data: HashMap::new(),
            retry_count: 0,
            max_retries: 2,
            status: ConversationStatus::Active,
            language,
            step_history: Vec::new(),
            caller_number: None,
            called_number: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Apply one turn's patch. The only mutation path for a record.
    ///
    /// Data is merged, never replaced: keys absent from the patch survive
    /// untouched. History append is bounded at [`STEP_HISTORY_LIMIT`].
    pub fn apply(&mut self, patch: &TurnPatch) {
        for (key, value) in &patch.data {
            self.collected_data.insert(key.clone(), value.clone());
        }
        for key in &patch.clear_fields {
            self.collected_data.remove(key);
        }

        if patch.next_step_id != self.current_step_id {
            self.step_history.push(StepHistoryEntry {
                step_id: self.current_step_id.clone(),
                at: Utc::now(),
            });
            if self.step_history.len() > STEP_HISTORY_LIMIT {
                let excess = self.step_history.len() - STEP_HISTORY_LIMIT;
                self.step_history.drain(0..excess);
            }
            self.previous_step_id = Some(self.current_step_id.clone());
            self.current_step_id = patch.next_step_id.clone();
        }

        self.retry_count = patch.retry_count;
        self.status = patch.status;

        if patch.terminal && self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }
}

/// Delta produced by one controller turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnPatch {
    /// Text to speak to the caller
    pub output_text: String,
    /// Step the record moves to
    pub next_step_id: String,
    /// Newly learned fields only
    pub data: HashMap<String, String>,
    /// Fields a deny-branch explicitly invalidated
    pub clear_fields: Vec<String>,
    pub retry_count: u32,
    pub status: ConversationStatus,
    pub terminal: bool,
}

impl TurnPatch {
    /// A patch that stays on the current step with no data changes
    pub fn stay(step_id: impl Into<String>, output_text: impl Into<String>, retry_count: u32) -> Self {
        Self {
            output_text: output_text.into(),
            next_step_id: step_id.into(),
            data: HashMap::new(),
            clear_fields: Vec::new(),
            retry_count,
            status: ConversationStatus::Active,
            terminal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ConversationRecord {
        ConversationRecord::new("call-1", "flow-1", "welcome", Language::Hindi)
    }

    fn advance_patch(next: &str) -> TurnPatch {
        TurnPatch {
            output_text: "ok".into(),
            next_step_id: next.into(),
            data: HashMap::new(),
            clear_fields: Vec::new(),
            retry_count: 0,
            status: ConversationStatus::Active,
            terminal: false,
        }
    }

    #[test]
    fn test_apply_advances_step() {
        let mut rec = record();
        rec.apply(&advance_patch("ask_pincode"));

        assert_eq!(rec.current_step_id, "ask_pincode");
        assert_eq!(rec.previous_step_id.as_deref(), Some("welcome"));
        assert_eq!(rec.step_history.len(), 1);
    }

    #[test]
    fn test_apply_merges_data_without_erasing() {
        let mut rec = record();
        rec.collected_data.insert("name".into(), "Rahul".into());

        let mut patch = advance_patch("next");
        patch.data.insert("pincode".into(), "305001".into());
        rec.apply(&patch);

        assert_eq!(rec.collected_data.get("name").map(String::as_str), Some("Rahul"));
        assert_eq!(rec.collected_data.get("pincode").map(String::as_str), Some("305001"));
    }

    #[test]
    fn test_apply_clears_denied_fields() {
        let mut rec = record();
        rec.collected_data.insert("pincode".into(), "305001".into());

        let mut patch = advance_patch("ask_pincode");
        patch.clear_fields.push("pincode".into());
        rec.apply(&patch);

        assert!(!rec.collected_data.contains_key("pincode"));
    }

    #[test]
    fn test_history_bounded() {
        let mut rec = record();
        for i in 0..(STEP_HISTORY_LIMIT + 20) {
            rec.apply(&advance_patch(&format!("step-{i}")));
        }
        assert_eq!(rec.step_history.len(), STEP_HISTORY_LIMIT);
        // Oldest entries were trimmed from the front
        assert_eq!(rec.step_history[0].step_id, "step-19");
    }

    #[test]
    fn test_terminal_sets_ended_at() {
        let mut rec = record();
        let mut patch = advance_patch("end");
        patch.status = ConversationStatus::Completed;
        patch.terminal = true;
        rec.apply(&patch);

        assert!(rec.ended_at.is_some());
        assert!(rec.status.is_terminal());
    }

    #[test]
    fn test_staying_on_step_adds_no_history() {
        let mut rec = record();
        rec.apply(&TurnPatch::stay("welcome", "again please", 1));

        assert!(rec.step_history.is_empty());
        assert_eq!(rec.retry_count, 1);
        assert_eq!(rec.current_step_id, "welcome");
    }
}
