use std::net::TcpStream;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::NpStream;

/// Connect to a bridge listening on TCP (blocking).
///
/// Nagle is disabled: UNPI frames are small and latency bound.
pub fn connect(addr: &str) -> Result<NpStream> {
    let stream = TcpStream::connect(addr).map_err(|e| TransportError::Connect {
        endpoint: format!("tcp://{addr}"),
        source: e,
    })?;
    stream.set_nodelay(true)?;
    debug!(%addr, "connected to tcp bridge");
    Ok(NpStream::from_tcp(stream))
}
