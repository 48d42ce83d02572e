//! Conversation store trait
//!
//! The durable engine behind this trait is an external collaborator. The
//! contract that matters here: exactly one writer applies a patch per turn,
//! and history appends are bounded by the record itself.

use async_trait::async_trait;

use crate::conversation::{ConversationRecord, ConversationStatus, TurnPatch};
use crate::error::Result;

/// Pluggable conversation persistence backend
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert a freshly created record
    async fn create(&self, record: ConversationRecord) -> Result<()>;

    /// Fetch a record by id
    async fn get(&self, id: &str) -> Result<Option<ConversationRecord>>;

    /// Apply one turn's patch and return the updated record
    async fn apply_patch(&self, id: &str, patch: &TurnPatch) -> Result<ConversationRecord>;

    /// Mark a conversation finished with the given status (used on socket
    /// close when no terminal patch was reached)
    async fn finish(&self, id: &str, status: ConversationStatus) -> Result<()>;
}
