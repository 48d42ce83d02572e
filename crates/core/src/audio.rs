//! PCM16 audio utilities
//!
//! Everything here operates on 16-bit signed little-endian mono PCM, the only
//! format that crosses the telephony wire. All functions are pure and
//! deterministic: identical input always produces identical output, which is
//! what makes frame-level tests and recording mix-downs reproducible.

use serde::{Deserialize, Serialize};

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - Telephony
    #[default]
    Hz8000,
    /// 16kHz - Standard speech recognition
    Hz16000,
    /// 22.05kHz - TTS output
    Hz22050,
    /// 44.1kHz - CD quality
    Hz44100,
    /// 48kHz - Professional audio
    Hz48000,
}

impl SampleRate {
    /// Get sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz22050 => 22050,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
        }
    }

    /// Samples in a 20ms frame at this rate
    pub fn frame_size_20ms(&self) -> usize {
        (self.as_u32() as usize * 20) / 1000
    }

    /// Samples per millisecond
    pub fn samples_per_ms(&self) -> usize {
        self.as_u32() as usize / 1000
    }
}

/// Standard WAV header length produced by the TTS collaborator
const WAV_HEADER_LEN: usize = 44;

/// Decode little-endian PCM16 bytes into samples.
///
/// A trailing odd byte is dropped rather than treated as an error; the wire
/// only ever carries whole samples.
pub fn bytes_to_pcm(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Encode samples as little-endian PCM16 bytes.
pub fn pcm_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Resample PCM16 between arbitrary rates via linear interpolation.
///
/// Interpolates over fractional source positions, clamping the upper index at
/// the final sample and the interpolated value to the 16-bit range. Empty and
/// single-sample buffers pass through without panicking.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let idx = idx.min(samples.len() - 1);
        let next = (idx + 1).min(samples.len() - 1);
        let frac = src_pos - idx as f64;

        let value = samples[idx] as f64 * (1.0 - frac) + samples[next] as f64 * frac;
        out.push(value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
    }

    out
}

/// Split a byte buffer into fixed-size chunks; the final chunk may be shorter.
pub fn chunk(buf: &[u8], chunk_len: usize) -> Vec<Vec<u8>> {
    if chunk_len == 0 {
        return Vec::new();
    }
    buf.chunks(chunk_len).map(|c| c.to_vec()).collect()
}

/// Generate `ms` milliseconds of PCM16 silence at the given rate.
pub fn silence(ms: u32, rate: SampleRate) -> Vec<u8> {
    vec![0u8; rate.samples_per_ms() * ms as usize * 2]
}

/// Additively mix `src` into `dst` starting at `offset` samples.
///
/// Overlapping samples saturate at the 16-bit range instead of wrapping, so
/// two parties speaking at once distort gracefully. Samples of `src` that
/// would fall past the end of `dst` are dropped.
pub fn mix_into(dst: &mut [i16], src: &[i16], offset: usize) {
    for (i, &s) in src.iter().enumerate() {
        let Some(slot) = dst.get_mut(offset + i) else {
            break;
        };
        *slot = slot.saturating_add(s);
    }
}

/// Strip the 44-byte WAV header the TTS collaborator prepends.
///
/// Buffers that do not start with a RIFF magic are returned untouched.
pub fn strip_wav_header(bytes: &[u8]) -> &[u8] {
    if bytes.len() > WAV_HEADER_LEN && bytes.starts_with(b"RIFF") {
        &bytes[WAV_HEADER_LEN..]
    } else {
        bytes
    }
}

/// Duration in milliseconds of a PCM16 byte buffer at the given rate.
pub fn duration_ms(byte_len: usize, rate: SampleRate) -> u64 {
    (byte_len / 2) as u64 * 1000 / rate.as_u32() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_conversions() {
        assert_eq!(SampleRate::Hz8000.as_u32(), 8000);
        assert_eq!(SampleRate::Hz8000.frame_size_20ms(), 160);
        assert_eq!(SampleRate::Hz22050.samples_per_ms(), 22);
    }

    #[test]
    fn test_pcm_byte_roundtrip() {
        let samples = vec![0i16, 1, -1, i16::MAX, i16::MIN];
        assert_eq!(bytes_to_pcm(&pcm_to_bytes(&samples)), samples);
    }

    #[test]
    fn test_resample_halves_and_doubles() {
        let samples: Vec<i16> = (0..160).map(|i| (i * 100) as i16).collect();

        let down = resample(&samples, 16000, 8000);
        assert_eq!(down.len(), 80);

        let up = resample(&down, 8000, 16000);
        assert_eq!(up.len(), 160);
    }

    #[test]
    fn test_resample_roundtrip_bounded_error() {
        // Slow ramp survives down-then-up within interpolation error
        let samples: Vec<i16> = (0..320).map(|i| (i * 10) as i16).collect();
        let restored = resample(&resample(&samples, 16000, 8000), 8000, 16000);

        for (a, b) in samples.iter().zip(restored.iter()) {
            assert!((a - b).abs() <= 20, "sample drifted: {} vs {}", a, b);
        }
    }

    #[test]
    fn test_resample_degenerate_inputs() {
        assert!(resample(&[], 22050, 8000).is_empty());
        let single = resample(&[1234], 22050, 8000);
        assert!(single.iter().all(|&s| s == 1234));
    }

    #[test]
    fn test_resample_deterministic() {
        let samples: Vec<i16> = (0..441).map(|i| ((i * 37) % 1000) as i16).collect();
        assert_eq!(
            resample(&samples, 22050, 8000),
            resample(&samples, 22050, 8000)
        );
    }

    #[test]
    fn test_chunk_final_shorter() {
        let buf = vec![0u8; 700];
        let chunks = chunk(&buf, 320);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 320);
        assert_eq!(chunks[2].len(), 60);
    }

    #[test]
    fn test_silence_length() {
        // 20ms at 8kHz = 160 samples = 320 bytes
        assert_eq!(silence(20, SampleRate::Hz8000).len(), 320);
    }

    #[test]
    fn test_mix_saturates() {
        let mut dst = vec![30000i16, -30000];
        mix_into(&mut dst, &[10000, -10000], 0);
        assert_eq!(dst, vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_mix_with_offset_and_overrun() {
        let mut dst = vec![0i16; 4];
        mix_into(&mut dst, &[1, 2, 3, 4], 2);
        assert_eq!(dst, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_strip_wav_header() {
        let mut wav = b"RIFF".to_vec();
        wav.extend(vec![0u8; 40]);
        wav.extend([1, 2, 3, 4]);
        assert_eq!(strip_wav_header(&wav), &[1, 2, 3, 4]);

        let raw = [1u8, 2, 3, 4];
        assert_eq!(strip_wav_header(&raw), &raw);
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(320, SampleRate::Hz8000), 20);
        assert_eq!(duration_ms(16000, SampleRate::Hz8000), 1000);
    }
}
