use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use znprims_transport::NpStream;

use crate::codec::{encode_frame, Frame, FrameConfig, FRAME_OVERHEAD};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(FRAME_OVERHEAD + config.max_payload_size),
            config,
        }
    }

    /// Write a complete frame (blocking) and flush.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<NpStream> {
    /// Create a frame writer for `NpStream` and apply write timeout from config.
    pub fn with_config_stream(inner: NpStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::Bytes;

    use super::*;
    use crate::codec::{decode_frame, MAX_PAYLOAD};
    use crate::subsystem::{CommandType, Subsystem};

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let ping = Frame::new(CommandType::Sreq, Subsystem::Sys, 0x01, Bytes::new());
        writer.write_frame(&ping).unwrap();

        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes, vec![0xFE, 0x00, 0x21, 0x01, 0x20]);
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let frames = [
            Frame::new(CommandType::Sreq, Subsystem::Sys, 0x01, Bytes::new()),
            Frame::new(CommandType::Sreq, Subsystem::Sys, 0x02, Bytes::new()),
        ];
        for frame in &frames {
            writer.write_frame(frame).unwrap();
        }

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        for expected in frames {
            let frame = decode_frame(&mut wire, MAX_PAYLOAD).unwrap().unwrap();
            assert_eq!(frame, expected);
        }
        assert!(wire.is_empty());
    }

    #[test]
    fn rejects_payload_over_configured_max() {
        let config = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), config);
        let frame = Frame::new(CommandType::Areq, Subsystem::Af, 0x81, vec![0u8; 5]);

        let err = writer.write_frame(&frame).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 5, max: 4 }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = FrameWriter::new(Closed);
        let frame = Frame::new(CommandType::Sreq, Subsystem::Sys, 0x01, Bytes::new());
        let err = writer.write_frame(&frame).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn interrupted_write_retries() {
        struct InterruptOnce {
            interrupted: bool,
            out: Vec<u8>,
        }
        impl Write for InterruptOnce {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                self.out.extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = FrameWriter::new(InterruptOnce {
            interrupted: false,
            out: Vec::new(),
        });
        let frame = Frame::new(CommandType::Sreq, Subsystem::Sys, 0x01, Bytes::new());
        writer.write_frame(&frame).unwrap();
        assert_eq!(writer.get_ref().out.len(), 5);
    }
}
