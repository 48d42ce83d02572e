//! Paced frame writer
//!
//! Outbound audio is split into 20ms/320-byte frames and written with a
//! pacing sleep between writes so playback matches real time. The pacing is
//! a deliberate rate limiter: removing it would burst the whole utterance
//! into the PBX jitter buffer, not speed anything up. A hangup flips the
//! cancellation watch and playback stops between frames.

use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use dhvani_config::constants::frame::PAYLOAD_BYTES;
use dhvani_core::audio::chunk;

use crate::error::{Result, TransportError};
use crate::frame::Frame;

/// Write half of an AudioSocket connection
pub struct FrameWriter<W> {
    writer: W,
    pace: Duration,
    cancel: watch::Receiver<bool>,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    pub fn new(writer: W, pace: Duration, cancel: watch::Receiver<bool>) -> Self {
        Self {
            writer,
            pace,
            cancel,
        }
    }

    /// Write a single frame immediately
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let encoded = frame.encode()?;
        self.writer.write_all(&encoded).await?;
        Ok(())
    }

    /// Split a PCM buffer into frames and play it out paced.
    ///
    /// Returns the number of frames written. Cancellation stops playback
    /// early without an error; an unwritable socket is an error so the
    /// session can tear down.
    pub async fn write_paced_audio(&mut self, pcm: &[u8]) -> Result<usize> {
        let mut written = 0;

        for piece in chunk(pcm, PAYLOAD_BYTES) {
            if *self.cancel.borrow() {
                tracing::debug!(frames = written, "playback cancelled mid-utterance");
                return Ok(written);
            }

            let frame = Frame::audio(Bytes::from(piece));
            self.write_frame(&frame).await?;
            written += 1;

            tokio::time::sleep(self.pace).await;
        }

        Ok(written)
    }

    /// Send a hangup frame and flush
    pub async fn hangup(&mut self) -> Result<()> {
        self.write_frame(&Frame::hangup()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Flush pending bytes
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.map_err(TransportError::from)
    }
}
