//! Fixed protocol and runtime constants
//!
//! These are wire-contract numbers, not tuning knobs; changing them breaks
//! interop with the PBX side.

/// AudioSocket frame constants
pub mod frame {
    /// `[type:u8][length:u16 BE]`
    pub const HEADER_LEN: usize = 3;
    /// Payload bytes in one 20ms telephony frame (160 samples of PCM16)
    pub const PAYLOAD_BYTES: usize = 320;
    /// Wall-clock duration of one frame
    pub const FRAME_MS: u64 = 20;
    /// Largest payload the length field can describe
    pub const MAX_PAYLOAD: usize = u16::MAX as usize;
}

/// Audio rates on either side of the bridge
pub mod audio {
    /// Telephony leg sample rate
    pub const TELEPHONY_RATE: u32 = 8000;
    /// TTS collaborator output rate, resampled down before the wire
    pub const TTS_RATE: u32 = 22050;
    /// Per-chunk duration used when stamping agent audio in recordings
    pub const RECORD_CHUNK_MS: u64 = 20;
}

/// Apology utterances spoken when a collaborator fails mid-turn.
///
/// Deliberately plain constants: the error path must not depend on another
/// collaborator call succeeding.
pub mod apology {
    pub const HINDI: &str = "माफ़ कीजिये, कुछ तकनीकी समस्या हुई। कृपया दोबारा बोलिए।";
    pub const ENGLISH: &str = "Sorry, something went wrong on our side. Could you please repeat that?";
}
