//! HTTP text-to-speech client

use async_trait::async_trait;

use dhvani_core::{Error, Language, Result, TextToSpeech};

/// Configuration for the HTTP TTS collaborator
#[derive(Debug, Clone)]
pub struct HttpTtsConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for HttpTtsConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8091".to_string(),
            timeout_ms: 15_000,
        }
    }
}

#[derive(serde::Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    language: &'a str,
    voice: &'a str,
}

/// HTTP TTS collaborator returning WAV bytes at the service's native rate
pub struct HttpTts {
    config: HttpTtsConfig,
    client: reqwest::Client,
}

impl HttpTts {
    pub fn new(config: HttpTtsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Tts(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl TextToSpeech for HttpTts {
    async fn speak(&self, text: &str, language: Language, voice_id: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/synthesize", self.config.url))
            .json(&SynthesizeRequest {
                text,
                language: language.code(),
                voice: voice_id,
            })
            .send()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Tts(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;

        if bytes.is_empty() {
            return Err(Error::Tts("collaborator returned no audio".into()));
        }

        tracing::debug!(chars = text.chars().count(), bytes = bytes.len(), "synthesized utterance");
        Ok(bytes.to_vec())
    }
}
