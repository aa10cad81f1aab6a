use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::Result;

/// A connected duplex byte stream to the radio bridge. Implements `Read + Write`.
///
/// On Unix this wraps either a Unix domain socket or a TCP stream; elsewhere
/// only TCP is available.
pub struct NpStream {
    inner: NpStreamInner,
}

enum NpStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for NpStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            NpStreamInner::Unix(stream) => stream.read(buf),
            NpStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for NpStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            NpStreamInner::Unix(stream) => stream.write(buf),
            NpStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            NpStreamInner::Unix(stream) => stream.flush(),
            NpStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl NpStream {
    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: NpStreamInner::Unix(stream),
        }
    }

    /// Wrap a connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: NpStreamInner::Tcp(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            NpStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            NpStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            NpStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            NpStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            NpStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            NpStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            NpStreamInner::Unix(_) => "unix-domain-socket",
            NpStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for NpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
