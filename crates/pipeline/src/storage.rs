//! HTTP recording storage client

use async_trait::async_trait;
use std::path::Path;

use dhvani_core::{Error, RecordingHandle, RecordingStorage, Result};

/// Configuration for the durable recording store
#[derive(Debug, Clone)]
pub struct HttpStorageConfig {
    /// Upload endpoint; the finished WAV is POSTed as the request body
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(serde::Deserialize)]
struct UploadResponse {
    url: String,
    #[serde(default)]
    duration: f64,
    public_id: String,
}

/// [`RecordingStorage`] over a simple HTTP upload endpoint
pub struct HttpRecordingStorage {
    config: HttpStorageConfig,
    client: reqwest::Client,
}

impl HttpRecordingStorage {
    pub fn new(config: HttpStorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Storage(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl RecordingStorage for HttpRecordingStorage {
    async fn upload(&self, local_file: &Path) -> Result<RecordingHandle> {
        let bytes = tokio::fs::read(local_file)
            .await
            .map_err(|e| Error::Storage(format!("read {}: {e}", local_file.display())))?;

        let response: UploadResponse = self
            .client
            .post(&self.config.url)
            .header("content-type", "audio/wav")
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Storage(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(RecordingHandle {
            url: response.url,
            duration_secs: response.duration,
            public_id: response.public_id,
        })
    }
}
