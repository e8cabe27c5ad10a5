//! Stream framing for byte-oriented transports.
//!
//! Every frame kind, camera chunks included, carries its payload length as a
//! little-endian `u16` at bytes 1..3, so a stream splits into frames without
//! knowing the kind.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::HEADER_SIZE;
use crate::error::{FrameError, Result};
use crate::kind::classify;
use crate::message::Message;

/// Default upper bound for a single inbound frame: a full camera chunk.
pub const DEFAULT_MAX_FRAME: usize = HEADER_SIZE + u16::MAX as usize;

/// `tokio_util` codec yielding whole raw frames.
///
/// Decoding does not interpret payloads; callers hand each frame to
/// [`Message::parse`] (or the per-kind parsers) and decide what to discard.
#[derive(Debug, Clone)]
pub struct LinkCodec {
    max_frame: usize,
}

impl LinkCodec {
    /// Create a codec accepting frames up to [`DEFAULT_MAX_FRAME`].
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    /// Create a codec with an explicit frame size bound (header included).
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            max_frame: max_frame.max(HEADER_SIZE),
        }
    }

    /// Current frame size bound.
    pub fn max_frame(&self) -> usize {
        self.max_frame
    }
}

impl Default for LinkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LinkCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let len = u16::from_le_bytes([src[1], src[2]]) as usize;
        let total = HEADER_SIZE + len;
        if total > self.max_frame {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.max_frame - HEADER_SIZE,
            });
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total).freeze();
        trace!(kind = %classify(&frame), size = total, "decoded frame");
        Ok(Some(frame))
    }
}

impl Encoder<Message> for LinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        item.encode(dst).map(|_| ())
    }
}

impl Encoder<Bytes> for LinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_frame {
            return Err(FrameError::PayloadTooLarge {
                size: item.len(),
                max: self.max_frame,
            });
        }
        dst.reserve(item.len());
        dst.put(item);
        Ok(())
    }
}
