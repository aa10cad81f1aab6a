use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::NpStream;

/// Maximum socket path length.
/// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
pub const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
pub const MAX_PATH_LEN: usize = 104;

/// Connect to a bridge listening on a Unix domain socket (blocking).
pub fn connect(path: impl AsRef<Path>) -> Result<NpStream> {
    let path = path.as_ref();
    check_path_len(path)?;

    let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
        endpoint: format!("unix:{}", path.display()),
        source: e,
    })?;
    debug!(?path, "connected to unix domain socket");
    Ok(NpStream::from_unix(stream))
}

pub(crate) fn check_path_len(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}
