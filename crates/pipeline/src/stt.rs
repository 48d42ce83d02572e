//! HTTP speech-to-text client
//!
//! Buffers call audio and posts it to the transcription collaborator,
//! emitting [`SttEvent`]s over a channel: interims while the caller speaks,
//! a final on flush. A language switch reconnects the logical stream without
//! dropping buffered-but-unsent audio, so mid-call language detection never
//! loses the start of an utterance.

use async_trait::async_trait;
use tokio::sync::mpsc;

use dhvani_core::{Error, Language, Result, SpeechToText, SttConfig, SttEvent, SttStream};

/// Configuration for the HTTP STT collaborator
#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    /// Base URL of the transcription service
    pub url: String,
    pub timeout_ms: u64,
    /// Bytes buffered between interim transcription requests
    pub interim_bytes: usize,
}

impl Default for HttpSttConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8090".to_string(),
            timeout_ms: 10_000,
            interim_bytes: 16_000, // 1 second at 8kHz PCM16
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    confidence: f32,
}

/// HTTP STT collaborator
pub struct HttpStt {
    config: HttpSttConfig,
    client: reqwest::Client,
}

impl HttpStt {
    pub fn new(config: HttpSttConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Stt(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl SpeechToText for HttpStt {
    async fn open_stream(
        &self,
        config: SttConfig,
    ) -> Result<(Box<dyn SttStream>, mpsc::Receiver<SttEvent>)> {
        let (events, rx) = mpsc::channel(64);
        let stream = HttpSttStream {
            client: self.client.clone(),
            url: self.config.url.clone(),
            interim_bytes: self.config.interim_bytes,
            language: config.language,
            sample_rate: config.sample_rate,
            interim_results: config.interim_results,
            buffer: Vec::with_capacity(64 * 1024),
            since_interim: 0,
            events,
            closed: false,
        };
        Ok((Box::new(stream), rx))
    }
}

struct HttpSttStream {
    client: reqwest::Client,
    url: String,
    interim_bytes: usize,
    language: Language,
    sample_rate: u32,
    interim_results: bool,
    /// Audio since the last final transcript
    buffer: Vec<u8>,
    /// Bytes received since the last interim request
    since_interim: usize,
    events: mpsc::Sender<SttEvent>,
    closed: bool,
}

impl HttpSttStream {
    async fn transcribe(&self) -> std::result::Result<TranscribeResponse, reqwest::Error> {
        self.client
            .post(format!("{}/transcribe", self.url))
            .query(&[
                ("language", self.language.code()),
                ("sample_rate", &self.sample_rate.to_string()),
            ])
            .header("content-type", "application/octet-stream")
            .body(self.buffer.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn emit(&self, event: SttEvent) {
        // A full or closed channel means the session stopped listening;
        // nothing useful to do with the event then.
        let _ = self.events.send(event).await;
    }
}

#[async_trait]
impl SttStream for HttpSttStream {
    async fn send(&mut self, pcm: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::Stt("stream is closed".into()));
        }

        self.buffer.extend_from_slice(pcm);
        self.since_interim += pcm.len();

        if self.interim_results && self.since_interim >= self.interim_bytes {
            self.since_interim = 0;
            match self.transcribe().await {
                Ok(resp) if !resp.text.is_empty() => {
                    self.emit(SttEvent::Interim(resp.text)).await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "interim transcription failed");
                    self.emit(SttEvent::Error(e.to_string())).await;
                }
            }
        }

        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Stt("stream is closed".into()));
        }
        if self.buffer.is_empty() {
            self.emit(SttEvent::UtteranceEnd).await;
            return Ok(());
        }

        match self.transcribe().await {
            Ok(resp) => {
                tracing::debug!(
                    text = %resp.text,
                    confidence = resp.confidence,
                    "final transcript"
                );
                self.buffer.clear();
                self.since_interim = 0;
                self.emit(SttEvent::Final(resp.text)).await;
                self.emit(SttEvent::UtteranceEnd).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "final transcription failed");
                self.emit(SttEvent::Error(e.to_string())).await;
            }
        }
        Ok(())
    }

    async fn reconnect(&mut self, language: Language) -> Result<()> {
        // The HTTP collaborator is stateless per request; switching language
        // is a parameter change. Buffered audio stays queued for the next
        // request, so nothing said so far is lost.
        tracing::info!(from = %self.language, to = %language, buffered = self.buffer.len(), "stt language switch");
        self.language = language;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> (HttpSttStream, mpsc::Receiver<SttEvent>) {
        let (events, rx) = mpsc::channel(4);
        (
            HttpSttStream {
                client: reqwest::Client::new(),
                url: "http://127.0.0.1:1".to_string(),
                interim_bytes: 16_000,
                language: Language::Hindi,
                sample_rate: 8000,
                // Interims off so no request fires below the threshold
                interim_results: false,
                buffer: Vec::new(),
                since_interim: 0,
                events,
                closed: false,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_reconnect_preserves_buffered_audio() {
        let (mut stream, _rx) = stream();

        stream.send(&[1u8; 320]).await.unwrap();
        stream.send(&[2u8; 320]).await.unwrap();
        assert_eq!(stream.buffer.len(), 640);

        stream.reconnect(Language::English).await.unwrap();
        assert_eq!(stream.language, Language::English);
        // Nothing said so far is lost across the language switch
        assert_eq!(stream.buffer.len(), 640);
    }

    #[tokio::test]
    async fn test_closed_stream_rejects_sends() {
        let (mut stream, _rx) = stream();
        stream.close().await.unwrap();
        assert!(stream.send(&[0u8; 320]).await.is_err());
        assert!(stream.finish().await.is_err());
    }

    #[tokio::test]
    async fn test_finish_on_empty_buffer_only_signals_utterance_end() {
        let (mut stream, mut rx) = stream();
        stream.finish().await.unwrap();
        assert_eq!(rx.recv().await, Some(SttEvent::UtteranceEnd));
    }
}
