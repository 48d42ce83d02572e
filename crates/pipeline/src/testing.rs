//! Scripted collaborator doubles
//!
//! Deterministic in-memory STT/TTS/storage implementations used by
//! integration tests to drive a full call without network services. They
//! live in the library (not behind `cfg(test)`) so downstream crates can use
//! them from their own `tests/` directories.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use dhvani_core::{
    Error, Language, RecordingHandle, RecordingStorage, Result, SpeechToText, SttConfig, SttEvent,
    SttStream, TextToSpeech,
};

/// STT double that replays scripted final transcripts.
///
/// Each `finish()` pops the next scripted line and emits it as a final
/// transcript; audio bytes are counted but otherwise ignored.
#[derive(Clone)]
pub struct ScriptedStt {
    finals: Arc<Mutex<VecDeque<String>>>,
    bytes_received: Arc<AtomicUsize>,
}

impl ScriptedStt {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            finals: Arc::new(Mutex::new(lines.into_iter().map(Into::into).collect())),
            bytes_received: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Total PCM bytes the session has streamed in
    pub fn bytes_received(&self) -> usize {
        self.bytes_received.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn open_stream(
        &self,
        config: SttConfig,
    ) -> Result<(Box<dyn SttStream>, mpsc::Receiver<SttEvent>)> {
        let (events, rx) = mpsc::channel(64);
        Ok((
            Box::new(ScriptedSttStream {
                finals: self.finals.clone(),
                bytes_received: self.bytes_received.clone(),
                language: config.language,
                buffered: 0,
                events,
                closed: false,
            }),
            rx,
        ))
    }
}

struct ScriptedSttStream {
    finals: Arc<Mutex<VecDeque<String>>>,
    bytes_received: Arc<AtomicUsize>,
    language: Language,
    buffered: usize,
    events: mpsc::Sender<SttEvent>,
    closed: bool,
}

#[async_trait]
impl SttStream for ScriptedSttStream {
    async fn send(&mut self, pcm: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::Stt("stream is closed".into()));
        }
        self.buffered += pcm.len();
        self.bytes_received.fetch_add(pcm.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.buffered = 0;
        match self.finals.lock().pop_front() {
            Some(text) => {
                let _ = self.events.send(SttEvent::Final(text)).await;
                let _ = self.events.send(SttEvent::UtteranceEnd).await;
            }
            None => {
                let _ = self.events.send(SttEvent::UtteranceEnd).await;
            }
        }
        Ok(())
    }

    async fn reconnect(&mut self, language: Language) -> Result<()> {
        self.language = language;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Build a minimal 44-byte-header mono PCM16 WAV buffer
pub fn fake_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }

    out
}

/// TTS double producing a deterministic 22.05kHz WAV per utterance
#[derive(Debug, Clone)]
pub struct ScriptedTts {
    pub sample_rate: u32,
}

impl ScriptedTts {
    pub fn new() -> Self {
        Self { sample_rate: 22_050 }
    }
}

impl Default for ScriptedTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextToSpeech for ScriptedTts {
    async fn speak(&self, text: &str, _language: Language, _voice_id: &str) -> Result<Vec<u8>> {
        // ~10ms of audio per character, amplitude fixed, fully reproducible
        let samples_len = text.chars().count().max(1) * (self.sample_rate as usize / 100);
        let samples = vec![1000i16; samples_len];
        Ok(fake_wav(self.sample_rate, &samples))
    }
}

/// Storage double that records uploads in memory
#[derive(Default)]
pub struct MemoryStorage {
    uploads: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }
}

#[async_trait]
impl RecordingStorage for MemoryStorage {
    async fn upload(&self, local_file: &Path) -> Result<RecordingHandle> {
        let name = local_file.display().to_string();
        self.uploads.lock().push(name.clone());
        Ok(RecordingHandle {
            url: format!("memory://{name}"),
            duration_secs: 0.0,
            public_id: format!("upload-{}", self.uploads.lock().len()),
        })
    }
}
