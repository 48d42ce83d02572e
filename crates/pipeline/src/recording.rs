//! Recording timeline builder
//!
//! Buffers both directions of call audio with wall-clock offsets and mixes
//! them into one mono track at finalize time.
//!
//! The two tracks are stamped differently on purpose. Caller audio arrives
//! in real time, so arrival offset from call start is its true position.
//! Agent audio is delivered in bursts by TTS; stamping it by arrival would
//! smear it across the timeline. Instead the session marks the instant
//! playback starts and each 20ms chunk is placed at
//! `mark + chunk_index * 20ms`.
//!
//! A recording failure must never fail the call: every error path degrades
//! to "no recording", and the temp file is removed on success and failure
//! alike (the tempfile deletes itself on drop).

use std::time::Instant;

use dhvani_config::constants::audio::RECORD_CHUNK_MS;
use dhvani_core::audio::{bytes_to_pcm, mix_into, SampleRate};
use dhvani_core::{RecordingHandle, RecordingStorage};

/// One buffered PCM chunk at a timeline offset
#[derive(Debug, Clone)]
struct Chunk {
    offset_ms: u64,
    pcm: Vec<u8>,
}

/// Dual-track recording timeline for one call
#[derive(Debug)]
pub struct RecordingTimeline {
    sample_rate: SampleRate,
    call_start: Instant,
    caller: Vec<Chunk>,
    agent: Vec<Chunk>,
    /// Offset of the current agent utterance plus chunks placed so far
    agent_mark: Option<(u64, u64)>,
}

impl RecordingTimeline {
    pub fn new(sample_rate: SampleRate) -> Self {
        Self {
            sample_rate,
            call_start: Instant::now(),
            caller: Vec::new(),
            agent: Vec::new(),
            agent_mark: None,
        }
    }

    /// Caller audio, stamped by arrival offset from call start
    pub fn record_caller(&mut self, pcm: &[u8]) {
        let offset_ms = self.call_start.elapsed().as_millis() as u64;
        self.record_caller_at(offset_ms, pcm);
    }

    pub fn record_caller_at(&mut self, offset_ms: u64, pcm: &[u8]) {
        if !pcm.is_empty() {
            self.caller.push(Chunk {
                offset_ms,
                pcm: pcm.to_vec(),
            });
        }
    }

    /// Mark the start of an agent utterance at the current call offset
    pub fn mark_agent_speech_start(&mut self) {
        let offset_ms = self.call_start.elapsed().as_millis() as u64;
        self.mark_agent_speech_start_at(offset_ms);
    }

    pub fn mark_agent_speech_start_at(&mut self, offset_ms: u64) {
        self.agent_mark = Some((offset_ms, 0));
    }

    /// One played 20ms agent chunk, stamped from the speech mark
    pub fn record_agent_chunk(&mut self, pcm: &[u8]) {
        let Some((mark, index)) = self.agent_mark else {
            tracing::warn!("agent chunk without a speech-start mark, dropping");
            return;
        };
        if !pcm.is_empty() {
            self.agent.push(Chunk {
                offset_ms: mark + index * RECORD_CHUNK_MS,
                pcm: pcm.to_vec(),
            });
        }
        self.agent_mark = Some((mark, index + 1));
    }

    pub fn is_empty(&self) -> bool {
        self.caller.is_empty() && self.agent.is_empty()
    }

    /// Merge both tracks into one silence-filled, additively mixed buffer.
    ///
    /// Overlapping speech saturates at the 16-bit range instead of wrapping.
    /// Returns `None` when nothing was captured.
    pub fn mixdown(&self) -> Option<Vec<i16>> {
        if self.is_empty() {
            return None;
        }

        let samples_per_ms = self.sample_rate.samples_per_ms() as u64;
        let end_samples = self
            .caller
            .iter()
            .chain(self.agent.iter())
            .map(|c| c.offset_ms * samples_per_ms + (c.pcm.len() / 2) as u64)
            .max()
            .unwrap_or(0) as usize;

        let mut mixed = vec![0i16; end_samples];
        for chunk in self.caller.iter().chain(self.agent.iter()) {
            let offset = (chunk.offset_ms * samples_per_ms) as usize;
            mix_into(&mut mixed, &bytes_to_pcm(&chunk.pcm), offset);
        }

        Some(mixed)
    }

    /// Encode, upload and clean up.
    ///
    /// `None` on any failure or when nothing was captured; the call outcome
    /// never depends on this.
    pub async fn finalize(self, storage: &dyn RecordingStorage) -> Option<RecordingHandle> {
        let mixed = self.mixdown()?;

        let file = match tempfile::Builder::new().suffix(".wav").tempfile() {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(error = %e, "recording temp file creation failed");
                return None;
            }
        };

        if let Err(e) = write_wav(file.path(), &mixed, self.sample_rate) {
            tracing::warn!(error = %e, "recording encode failed");
            return None;
        }

        match storage.upload(file.path()).await {
            Ok(handle) => {
                tracing::info!(url = %handle.url, duration_secs = handle.duration_secs, "recording uploaded");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "recording upload failed");
                None
            }
        }
        // `file` drops here on every path, removing the temp file
    }
}

fn write_wav(
    path: &std::path::Path,
    samples: &[i16],
    sample_rate: SampleRate,
) -> crate::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate.as_u32(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| crate::PipelineError::Encode(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| crate::PipelineError::Encode(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| crate::PipelineError::Encode(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dhvani_core::audio::pcm_to_bytes;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};

    struct CapturingStorage {
        uploaded: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl CapturingStorage {
        fn new(fail: bool) -> Self {
            Self {
                uploaded: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl RecordingStorage for CapturingStorage {
        async fn upload(&self, local_file: &Path) -> dhvani_core::Result<RecordingHandle> {
            if self.fail {
                return Err(dhvani_core::Error::Storage("upload refused".into()));
            }
            assert!(local_file.exists());
            self.uploaded.lock().push(local_file.to_path_buf());
            Ok(RecordingHandle {
                url: "https://store.example/rec.mp3".into(),
                duration_secs: 1.0,
                public_id: "rec-1".into(),
            })
        }
    }

    #[test]
    fn test_empty_timeline_mixes_to_none() {
        let timeline = RecordingTimeline::new(SampleRate::Hz8000);
        assert!(timeline.mixdown().is_none());
    }

    #[test]
    fn test_caller_chunk_placed_at_offset() {
        let mut timeline = RecordingTimeline::new(SampleRate::Hz8000);
        timeline.record_caller_at(10, &pcm_to_bytes(&[100, 200]));

        let mixed = timeline.mixdown().unwrap();
        // 10ms at 8kHz = 80 samples of leading silence
        assert_eq!(mixed.len(), 82);
        assert!(mixed[..80].iter().all(|&s| s == 0));
        assert_eq!(&mixed[80..], &[100, 200]);
    }

    #[test]
    fn test_agent_chunks_stamped_from_mark_not_arrival() {
        let mut timeline = RecordingTimeline::new(SampleRate::Hz8000);
        timeline.mark_agent_speech_start_at(100);

        // TTS delivers in a burst; placement must still be 20ms apart
        let chunk = pcm_to_bytes(&vec![1i16; 160]);
        timeline.record_agent_chunk(&chunk);
        timeline.record_agent_chunk(&chunk);
        timeline.record_agent_chunk(&chunk);

        let mixed = timeline.mixdown().unwrap();
        // Last chunk starts at 140ms, ends at 160ms
        assert_eq!(mixed.len(), 160 * 8);
        assert_eq!(mixed[100 * 8], 1);
        assert_eq!(mixed[120 * 8], 1);
        assert_eq!(mixed[159 * 8], 1);
        assert!(mixed[..100 * 8].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_overlap_mixes_additively_with_clamp() {
        let mut timeline = RecordingTimeline::new(SampleRate::Hz8000);
        timeline.record_caller_at(0, &pcm_to_bytes(&[20_000, -20_000]));
        timeline.mark_agent_speech_start_at(0);
        timeline.record_agent_chunk(&pcm_to_bytes(&[20_000, -20_000]));

        let mixed = timeline.mixdown().unwrap();
        assert_eq!(mixed[0], i16::MAX);
        assert_eq!(mixed[1], i16::MIN);
    }

    #[test]
    fn test_agent_chunk_without_mark_is_dropped() {
        let mut timeline = RecordingTimeline::new(SampleRate::Hz8000);
        timeline.record_agent_chunk(&pcm_to_bytes(&[1, 2, 3]));
        assert!(timeline.mixdown().is_none());
    }

    #[tokio::test]
    async fn test_finalize_uploads_and_returns_handle() {
        let mut timeline = RecordingTimeline::new(SampleRate::Hz8000);
        timeline.record_caller_at(0, &pcm_to_bytes(&vec![5i16; 800]));

        let storage = CapturingStorage::new(false);
        let handle = timeline.finalize(&storage).await.unwrap();
        assert_eq!(handle.public_id, "rec-1");

        // Temp file is gone after finalize
        let uploaded = storage.uploaded.lock();
        assert!(!uploaded[0].exists());
    }

    #[tokio::test]
    async fn test_finalize_upload_failure_degrades_to_none() {
        let mut timeline = RecordingTimeline::new(SampleRate::Hz8000);
        timeline.record_caller_at(0, &pcm_to_bytes(&[1, 2, 3]));

        let storage = CapturingStorage::new(true);
        assert!(timeline.finalize(&storage).await.is_none());
    }

    #[tokio::test]
    async fn test_finalize_empty_skips_upload() {
        let timeline = RecordingTimeline::new(SampleRate::Hz8000);
        let storage = CapturingStorage::new(false);
        assert!(timeline.finalize(&storage).await.is_none());
    }
}
