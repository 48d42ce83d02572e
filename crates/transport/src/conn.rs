//! Per-connection read loop and state machine
//!
//! Each accepted socket walks `AwaitingUuid -> Active -> Closing`: the first
//! frame must be the UUID handshake, everything after that is dispatched by
//! frame kind, and any close or error lands in `Closing` exactly once.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use std::time::Duration;

use crate::error::Result;
use crate::frame::{Frame, FrameParser};
use crate::writer::FrameWriter;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnState {
    /// Nothing but a UUID frame is acceptable yet
    #[default]
    AwaitingUuid,
    /// Handshake done; audio and control frames flow
    Active,
    /// Teardown has begun; no further dispatch
    Closing,
}

impl ConnState {
    pub fn is_active(&self) -> bool {
        matches!(self, ConnState::Active)
    }

    pub fn is_closing(&self) -> bool {
        matches!(self, ConnState::Closing)
    }
}

/// Read half of an AudioSocket connection
pub struct Connection<R> {
    reader: R,
    parser: FrameParser,
    read_buf: Vec<u8>,
}

impl Connection<tokio::net::tcp::OwnedReadHalf> {
    /// Split a TCP stream into a frame reader and a paced writer sharing a
    /// cancellation watch.
    pub fn split(
        stream: TcpStream,
        pace: Duration,
    ) -> (
        Self,
        FrameWriter<tokio::net::tcp::OwnedWriteHalf>,
        watch::Sender<bool>,
    ) {
        let (read_half, write_half) = stream.into_split();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (
            Connection::new(read_half),
            FrameWriter::new(write_half, pace, cancel_rx),
            cancel_tx,
        )
    }
}

impl<R: AsyncRead + Unpin + Send> Connection<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: FrameParser::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    /// Read the next complete frame.
    ///
    /// Buffers partial deliveries internally; returns `Ok(None)` on a clean
    /// EOF from the peer.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.parser.next_frame() {
                return Ok(Some(frame));
            }

            let n = self.reader.read(&mut self.read_buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.parser.push(&self.read_buf[..n]);
        }
    }
}
