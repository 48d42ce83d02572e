//! AudioSocket transport
//!
//! The PBX side speaks a length-prefixed binary TCP protocol: a 3-byte
//! header `[type:u8][length:u16 BE]` followed by the payload. One TCP
//! connection is one phone call. This crate owns the bit-exact framing, the
//! incremental parser that survives arbitrary TCP delivery boundaries, the
//! paced outbound writer, and the per-connection state machine.

pub mod conn;
pub mod error;
pub mod frame;
pub mod writer;

pub use conn::{ConnState, Connection};
pub use error::{Result, TransportError};
pub use frame::{parse_uuid_payload, Frame, FrameKind, FrameParser, UuidPayload};
pub use writer::FrameWriter;
