//! Speech collaborator traits
//!
//! STT is consumed as a transcript source only; nothing it emits ever
//! advances dialog state directly. TTS is a one-shot synthesis call; pacing
//! and resampling happen downstream in the session.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::language::Language;

/// Configuration for an STT stream
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub language: Language,
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Emit interim transcripts while the caller is still speaking
    pub interim_results: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            language: Language::Hindi,
            sample_rate: 8000,
            interim_results: true,
        }
    }
}

/// Events emitted by an STT stream
#[derive(Debug, Clone, PartialEq)]
pub enum SttEvent {
    /// Partial transcript, may still change
    Interim(String),
    /// Final transcript for a stretch of speech
    Final(String),
    /// The collaborator detected end of utterance
    UtteranceEnd,
    /// Transport or service error; the stream may need a reconnect
    Error(String),
}

/// Speech-to-Text interface
///
/// `open_stream` returns the write half and the event receiver for one call's
/// audio. One stream per call; a language switch reconnects the same stream.
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    async fn open_stream(
        &self,
        config: SttConfig,
    ) -> Result<(Box<dyn SttStream>, mpsc::Receiver<SttEvent>)>;
}

/// Write half of an open STT stream
#[async_trait]
pub trait SttStream: Send + Sync {
    /// Feed raw PCM16 bytes
    async fn send(&mut self, pcm: &[u8]) -> Result<()>;

    /// Flush buffered audio and request a final transcript
    async fn finish(&mut self) -> Result<()>;

    /// Reconnect with a new language without losing buffered audio
    async fn reconnect(&mut self, language: Language) -> Result<()>;

    /// Tear the stream down; further sends fail
    async fn close(&mut self) -> Result<()>;
}

/// Text-to-Speech interface
///
/// Returns a complete WAV buffer (44-byte header + PCM16) at the
/// collaborator's native rate.
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    async fn speak(&self, text: &str, language: Language, voice_id: &str) -> Result<Vec<u8>>;
}
