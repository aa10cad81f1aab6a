//! UNPI frame codec for Z-Stack network processors.
//!
//! Every command on the serial link is framed as:
//! - A start-of-frame byte (`0xFE`) for stream synchronization
//! - A 1-byte payload length
//! - Two header bytes: `(type << 5) | subsystem`, then the command id
//! - The payload, then an XOR frame check sequence
//!
//! Corrupt input never surfaces to callers: the decoder drops the bad start
//! byte, logs, and rescans for the next start marker.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod subsystem;
pub mod writer;

#[cfg(feature = "async")]
pub mod unpi_codec;

pub use codec::{
    checksum, decode_frame, encode_frame, Frame, FrameConfig, FRAME_OVERHEAD, HEADER_SIZE,
    MAX_PAYLOAD, SOF,
};
pub use decoder::{decode_resync, DecodeStats, FrameDecoder};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use subsystem::{CommandType, Subsystem};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use unpi_codec::UnpiCodec;
