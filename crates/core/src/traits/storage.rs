//! Recording storage trait

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Result of uploading a finished recording
#[derive(Debug, Clone)]
pub struct RecordingHandle {
    pub url: String,
    pub duration_secs: f64,
    pub public_id: String,
}

/// Durable object storage for call recordings
#[async_trait]
pub trait RecordingStorage: Send + Sync {
    /// Upload a local file and return its durable handle
    async fn upload(&self, local_file: &Path) -> Result<RecordingHandle>;
}
