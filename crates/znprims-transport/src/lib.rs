//! Duplex byte-stream endpoints for a network processor link.
//!
//! The radio itself sits behind a serial port that this crate never opens or
//! configures. Instead it connects to a bridge that already owns the port:
//! - Unix domain sockets (e.g. `socat UNIX-LISTEN:/run/znp.sock /dev/ttyACM0,raw`)
//! - TCP (e.g. `ser2net`, network coordinators)
//!
//! This is the lowest layer of znprims. Everything else builds on top of the
//! [`NpStream`] type (blocking) or [`AsyncNpStream`] (tokio, `async` feature).

pub mod endpoint;
pub mod error;
pub mod tcp;
pub mod traits;

#[cfg(feature = "async")]
pub mod async_stream;
#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use traits::NpStream;

#[cfg(feature = "async")]
pub use async_stream::{connect_async, AsyncNpStream};

/// Connect to an endpoint (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<NpStream> {
    match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => uds::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(path) => Err(TransportError::Connect {
            endpoint: endpoint.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("unix domain sockets are unavailable ({})", path.display()),
            ),
        }),
        Endpoint::Tcp(addr) => tcp::connect(addr),
    }
}
