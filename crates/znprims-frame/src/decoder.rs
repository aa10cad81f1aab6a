use bytes::BytesMut;
use tracing::{debug, warn};

use crate::codec::{decode_frame, Frame, MAX_PAYLOAD};

/// Counters kept while resynchronising a byte stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Frames decoded successfully.
    pub frames: u64,
    /// Checksum or length failures recovered by resynchronising.
    pub framing_errors: u64,
    /// Bytes dropped while hunting for a start marker.
    pub discarded_bytes: u64,
}

/// Decode the next valid frame, recovering from corruption.
///
/// Framing errors are logged and counted; the decoder drops the bad start byte
/// and keeps scanning. Returns `None` once the buffer holds no complete frame.
pub fn decode_resync(
    src: &mut BytesMut,
    max_payload: usize,
    stats: &mut DecodeStats,
) -> Option<Frame> {
    loop {
        let before = src.len();
        match decode_frame(src, max_payload) {
            Ok(Some(frame)) => {
                let skipped = before - src.len() - frame.wire_size();
                note_discarded(stats, skipped);
                stats.frames += 1;
                return Some(frame);
            }
            Ok(None) => {
                note_discarded(stats, before - src.len());
                return None;
            }
            Err(err) => {
                stats.framing_errors += 1;
                stats.discarded_bytes += (before - src.len()) as u64;
                warn!(error = %err, buffered = src.len(), "framing error; resynchronising");
            }
        }
    }
}

fn note_discarded(stats: &mut DecodeStats, skipped: usize) {
    if skipped > 0 {
        stats.discarded_bytes += skipped as u64;
        debug!(skipped, "discarded bytes before start of frame");
    }
}

/// Push-style decoder: feed chunks as they arrive, pull complete frames.
///
/// Never blocks; an incomplete frame simply stays buffered until the next
/// [`extend`](FrameDecoder::extend).
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_payload: usize,
    stats: DecodeStats,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(2 * (MAX_PAYLOAD + 5)),
            max_payload,
            stats: DecodeStats::default(),
        }
    }

    /// Append received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete frame, if any.
    pub fn decode_next(&mut self) -> Option<Frame> {
        decode_resync(&mut self.buf, self.max_payload, &mut self.stats)
    }

    /// Bytes waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Drop any partial frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
