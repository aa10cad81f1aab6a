use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Tokio counterpart of [`NpStream`](crate::NpStream).
#[derive(Debug)]
pub enum AsyncNpStream {
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
    Tcp(TcpStream),
}

/// Connect to an endpoint without blocking the runtime.
pub async fn connect_async(endpoint: &Endpoint) -> Result<AsyncNpStream> {
    let connect_err = |source| TransportError::Connect {
        endpoint: endpoint.to_string(),
        source,
    };

    match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            crate::uds::check_path_len(path)?;
            let stream = tokio::net::UnixStream::connect(path)
                .await
                .map_err(connect_err)?;
            debug!(?path, "connected to unix domain socket");
            Ok(AsyncNpStream::Unix(stream))
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(connect_err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix domain sockets are unavailable on this platform",
        ))),
        Endpoint::Tcp(addr) => {
            let stream = TcpStream::connect(addr.as_str())
                .await
                .map_err(connect_err)?;
            stream.set_nodelay(true)?;
            debug!(%addr, "connected to tcp bridge");
            Ok(AsyncNpStream::Tcp(stream))
        }
    }
}

impl AsyncRead for AsyncNpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            AsyncNpStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            AsyncNpStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for AsyncNpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            #[cfg(unix)]
            AsyncNpStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            AsyncNpStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            AsyncNpStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
            AsyncNpStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            AsyncNpStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            AsyncNpStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn tcp_roundtrip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 3];
            conn.read_exact(&mut buf).await.unwrap();
            conn.write_all(&buf).await.unwrap();
        });

        let mut stream = connect_async(&Endpoint::Tcp(addr)).await.unwrap();
        stream.write_all(b"abc").await.unwrap();
        let mut echoed = [0u8; 3];
        stream.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"abc");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn missing_unix_socket_fails_with_connect() {
        let endpoint: Endpoint = "/tmp/znprims-async-missing.sock".parse().unwrap();
        let err = connect_async(&endpoint).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
