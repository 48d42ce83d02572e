//! Frame codec and incremental parser
//!
//! Wire format, bit-exact: `[type:u8][length:u16 big-endian][payload]`.
//! AUDIO is `0x10`, not `0x01`; `0x01` is the UUID handshake frame. Payload
//! of AUDIO frames is raw PCM16 little-endian mono at the call's sample
//! rate.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use dhvani_core::audio::{silence, SampleRate};
use dhvani_config::constants::frame::{HEADER_LEN, MAX_PAYLOAD};

use crate::error::{Result, TransportError};

/// Frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// 0x00: either side is ending the call
    Hangup,
    /// 0x01: first frame of a call, payload `"<callId>:<calledNumber|empty>"`
    Uuid,
    /// 0x02: peer-reported error
    Error,
    /// 0x03: silence marker
    Silence,
    /// 0x10: PCM16 audio payload
    Audio,
    /// Anything else: logged and ignored, the connection continues
    Unknown(u8),
}

impl FrameKind {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => FrameKind::Hangup,
            0x01 => FrameKind::Uuid,
            0x02 => FrameKind::Error,
            0x03 => FrameKind::Silence,
            0x10 => FrameKind::Audio,
            other => FrameKind::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            FrameKind::Hangup => 0x00,
            FrameKind::Uuid => 0x01,
            FrameKind::Error => 0x02,
            FrameKind::Silence => 0x03,
            FrameKind::Audio => 0x10,
            FrameKind::Unknown(other) => *other,
        }
    }
}

/// One parsed or to-be-sent frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Audio frame from a PCM16 buffer (callers chunk to frame size first)
    pub fn audio(pcm: impl Into<Bytes>) -> Self {
        Self::new(FrameKind::Audio, pcm)
    }

    /// N milliseconds of telephony-rate silence
    pub fn silence_ms(ms: u32) -> Self {
        Self::new(FrameKind::Silence, silence(ms, SampleRate::Hz8000))
    }

    pub fn hangup() -> Self {
        Self::new(FrameKind::Hangup, Bytes::new())
    }

    /// Serialize header + payload
    pub fn encode(&self) -> Result<Bytes> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(TransportError::Frame(format!(
                "payload of {} bytes exceeds the u16 length field",
                self.payload.len()
            )));
        }
        let mut out = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        out.put_u8(self.kind.as_u8());
        out.put_u16(self.payload.len() as u16);
        out.put_slice(&self.payload);
        Ok(out.freeze())
    }
}

/// Incremental frame parser over an accumulating buffer.
///
/// TCP delivers bytes at arbitrary boundaries; `next_frame` consumes nothing
/// until a complete `3 + length` byte frame is available, so no split ever
/// loses or duplicates bytes.
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: BytesMut,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete frame, or `None` while bytes are still missing
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.buf.len() < HEADER_LEN {
            return None;
        }

        let length = u16::from_be_bytes([self.buf[1], self.buf[2]]) as usize;
        if self.buf.len() < HEADER_LEN + length {
            return None;
        }

        let kind = FrameKind::from_u8(self.buf[0]);
        self.buf.advance(HEADER_LEN);
        let payload = self.buf.split_to(length).freeze();

        Some(Frame { kind, payload })
    }

    /// Bytes buffered but not yet framed
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Parsed UUID handshake payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidPayload {
    pub call_id: String,
    /// Dialed number; empty segment means the switch did not pass one
    pub called_number: Option<String>,
}

/// Parse `"<callId>:<calledNumber|empty>"`
pub fn parse_uuid_payload(payload: &[u8]) -> Result<UuidPayload> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| TransportError::UuidPayload("payload is not utf-8".into()))?;

    let (call_id, called) = match text.split_once(':') {
        Some((id, called)) => (id, called),
        None => (text, ""),
    };

    if call_id.is_empty() {
        return Err(TransportError::UuidPayload("empty call id".into()));
    }

    Ok(UuidPayload {
        call_id: call_id.to_string(),
        called_number: if called.is_empty() {
            None
        } else {
            Some(called.to_string())
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded_audio(payload: &[u8]) -> Bytes {
        Frame::audio(payload.to_vec()).encode().unwrap()
    }

    #[test]
    fn test_kind_roundtrip() {
        for value in [0x00u8, 0x01, 0x02, 0x03, 0x10, 0x7f] {
            assert_eq!(FrameKind::from_u8(value).as_u8(), value);
        }
        // AUDIO is 0x10, not 0x01
        assert_eq!(FrameKind::Audio.as_u8(), 0x10);
        assert_eq!(FrameKind::Uuid.as_u8(), 0x01);
    }

    #[test]
    fn test_encode_layout() {
        let encoded = encoded_audio(&[0xAA, 0xBB]);
        assert_eq!(&encoded[..], &[0x10, 0x00, 0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let frame = Frame::audio(vec![0u8; MAX_PAYLOAD + 1]);
        assert!(frame.encode().is_err());
    }

    #[test]
    fn test_parse_whole_frame() {
        let mut parser = FrameParser::new();
        parser.push(&encoded_audio(&[1, 2, 3, 4]));

        let frame = parser.next_frame().unwrap();
        assert_eq!(frame.kind, FrameKind::Audio);
        assert_eq!(&frame.payload[..], &[1, 2, 3, 4]);
        assert!(parser.next_frame().is_none());
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_parse_across_arbitrary_splits() {
        let encoded = encoded_audio(&(0..50).collect::<Vec<u8>>());

        // Every possible split point reconstructs exactly one frame
        for split in 1..encoded.len() {
            let mut parser = FrameParser::new();
            parser.push(&encoded[..split]);
            assert!(
                parser.next_frame().is_none(),
                "frame completed early at split {split}"
            );
            parser.push(&encoded[split..]);
            let frame = parser.next_frame().expect("frame after full delivery");
            assert_eq!(frame.payload.len(), 50);
            assert!(parser.next_frame().is_none());
        }
    }

    #[test]
    fn test_parse_back_to_back_frames_in_one_delivery() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&encoded_audio(&[1, 2]));
        bytes.extend_from_slice(&Frame::hangup().encode().unwrap());

        let mut parser = FrameParser::new();
        parser.push(&bytes);

        assert_eq!(parser.next_frame().unwrap().kind, FrameKind::Audio);
        assert_eq!(parser.next_frame().unwrap().kind, FrameKind::Hangup);
        assert!(parser.next_frame().is_none());
    }

    #[test]
    fn test_header_alone_is_incomplete() {
        let mut parser = FrameParser::new();
        parser.push(&[0x10, 0x01, 0x00]); // announces 256 payload bytes
        assert!(parser.next_frame().is_none());
        assert_eq!(parser.pending(), 3);
    }

    #[test]
    fn test_unknown_kind_still_parses() {
        let frame = Frame::new(FrameKind::Unknown(0x42), vec![9u8]);
        let mut parser = FrameParser::new();
        parser.push(&frame.encode().unwrap());
        assert_eq!(parser.next_frame().unwrap().kind, FrameKind::Unknown(0x42));
    }

    #[test]
    fn test_silence_frame_duration() {
        let frame = Frame::silence_ms(20);
        // 20ms at 8kHz PCM16 = 320 bytes of zeros
        assert_eq!(frame.payload.len(), 320);
        assert!(frame.payload.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_uuid_payload_with_did() {
        let parsed = parse_uuid_payload(b"abc123:9140000000").unwrap();
        assert_eq!(parsed.call_id, "abc123");
        assert_eq!(parsed.called_number.as_deref(), Some("9140000000"));
    }

    #[test]
    fn test_uuid_payload_without_did() {
        let parsed = parse_uuid_payload(b"abc123:").unwrap();
        assert_eq!(parsed.call_id, "abc123");
        assert_eq!(parsed.called_number, None);
    }

    #[test]
    fn test_uuid_payload_rejects_empty_id() {
        assert!(parse_uuid_payload(b":123").is_err());
        assert!(parse_uuid_payload(&[0xff, 0xfe]).is_err());
    }
}
