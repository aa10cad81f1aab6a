//! `tokio_util` codec so frames can ride `FramedRead` / `FramedWrite`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{encode_frame, Frame, MAX_PAYLOAD};
use crate::decoder::{decode_resync, DecodeStats};
use crate::error::{FrameError, Result};

/// Stream codec for UNPI frames.
///
/// Decoding never returns a framing error: a corrupt frame would otherwise
/// terminate the whole stream, so bad bytes are skipped and counted instead.
#[derive(Debug)]
pub struct UnpiCodec {
    max_payload: usize,
    stats: DecodeStats,
}

impl UnpiCodec {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            max_payload,
            stats: DecodeStats::default(),
        }
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }
}

impl Default for UnpiCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for UnpiCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        Ok(decode_resync(src, self.max_payload, &mut self.stats))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            debug!(leftover = src.len(), "dropping partial frame at end of stream");
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<Frame> for UnpiCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&frame, dst)
    }
}

impl Encoder<&Frame> for UnpiCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(frame, dst)
    }
}
