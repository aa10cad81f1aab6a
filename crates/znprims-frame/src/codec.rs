use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::subsystem::{cmd0, split_cmd0, CommandType, Subsystem};

/// Start-of-frame marker.
pub const SOF: u8 = 0xFE;

/// Bytes before the payload: SOF (1) + length (1) + cmd0 (1) + cmd1 (1).
pub const HEADER_SIZE: usize = 4;

/// Header plus the trailing FCS byte.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + 1;

/// Largest payload the radio accepts in a single frame.
pub const MAX_PAYLOAD: usize = 250;

/// One command on the wire, before field decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: CommandType,
    pub subsystem: Subsystem,
    /// Command id (`cmd1`).
    pub command: u8,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(
        kind: CommandType,
        subsystem: Subsystem,
        command: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            kind,
            subsystem,
            command,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload + FCS).
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// XOR of every byte: the UNPI frame check sequence.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, byte| acc ^ byte)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬─────────┬──────────────────────┬──────────┬───────────┬───────┐
/// │ SOF  │ Length  │ cmd0                 │ cmd1     │ Payload   │ FCS   │
/// │ 0xFE │ (1B)    │ type<<5 | subsystem  │ command  │ (Length)  │ XOR   │
/// └──────┴─────────┴──────────────────────┴──────────┴───────────┴───────┘
/// ```
/// The FCS covers length, both header bytes and the payload.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let len = frame.payload.len();
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD,
        });
    }

    let header = [len as u8, cmd0(frame.kind, frame.subsystem), frame.command];
    let fcs = checksum(&header) ^ checksum(&frame.payload);

    dst.reserve(frame.wire_size());
    dst.put_u8(SOF);
    dst.put_slice(&header);
    dst.put_slice(&frame.payload);
    dst.put_u8(fcs);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Bytes before the first start marker are discarded. Returns `Ok(None)` if
/// the buffer doesn't contain a complete frame yet; the partial frame stays
/// buffered. On success, consumes the frame bytes from the buffer.
///
/// On a framing error (bad checksum, impossible length) exactly one byte, the
/// offending start marker, has been consumed, so calling again rescans from
/// the next candidate.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    match src.iter().position(|&byte| byte == SOF) {
        Some(0) => {}
        Some(offset) => src.advance(offset),
        None => {
            src.clear();
            return Ok(None);
        }
    }

    if src.len() < 2 {
        return Ok(None); // Need the length byte
    }

    let payload_len = src[1] as usize;
    if payload_len > max_payload {
        src.advance(1);
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = FRAME_OVERHEAD + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let expected = checksum(&src[1..total - 1]);
    let found = src[total - 1];
    if expected != found {
        src.advance(1);
        return Err(FrameError::ChecksumMismatch { expected, found });
    }

    let (kind, subsystem) = split_cmd0(src[2]);
    let command = src[3];
    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(1);

    Ok(Some(Frame {
        kind,
        subsystem,
        command,
        payload,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 250.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
