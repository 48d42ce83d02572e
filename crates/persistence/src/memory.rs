//! In-memory conversation store

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use dhvani_core::{
    ConversationRecord, ConversationStatus, ConversationStore, Error, Result, TurnPatch,
};

/// DashMap-backed store.
///
/// Patch application happens under the record's map entry, which serializes
/// writers per conversation; concurrent sessions for different calls never
/// contend on the same entry.
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    records: DashMap<String, ConversationRecord>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn create(&self, record: ConversationRecord) -> Result<()> {
        tracing::debug!(id = %record.id, flow = %record.flow_id, "conversation created");
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationRecord>> {
        Ok(self.records.get(id).map(|e| e.value().clone()))
    }

    async fn apply_patch(&self, id: &str, patch: &TurnPatch) -> Result<ConversationRecord> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        entry.value_mut().apply(patch);
        Ok(entry.value().clone())
    }

    async fn finish(&self, id: &str, status: ConversationStatus) -> Result<()> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let record = entry.value_mut();

        // A terminal patch may already have closed the record; keep the
        // first outcome rather than overwriting completed with abandoned.
        if !record.status.is_terminal() {
            record.status = status;
            record.ended_at = Some(Utc::now());
            tracing::debug!(id = %record.id, status = ?status, "conversation finished");
        }
        Ok(())
    }
}
