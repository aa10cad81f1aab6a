//! Drive an [`Engine`] over a live byte stream.
//!
//! Two tasks per connection: a reader that feeds received chunks to
//! [`Engine::on_bytes`] and sweeps expired waiters on an interval, and a
//! writer that drains [`Outbound`] through [`UnpiCodec`]. Either task ending
//! (EOF, I/O error or [`Connection::close`]) shuts the engine down so no
//! caller is left waiting on a dead link.

use std::sync::Arc;

use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use znprims_frame::{Frame, UnpiCodec};
use znprims_registry::CommandRegistry;
use znprims_transport::{connect_async, Endpoint};

use crate::config::EngineConfig;
use crate::engine::{Engine, Outbound};
use crate::error::Result;

/// A running engine bound to a stream.
#[derive(Debug)]
pub struct Connection {
    engine: Engine,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Whether either I/O task has stopped.
    pub fn is_closed(&self) -> bool {
        self.reader.is_finished() || self.writer.is_finished()
    }

    /// Stop both tasks and cancel outstanding waiters.
    pub async fn close(self) {
        self.cancel.cancel();
        self.engine.shutdown();
        if let Err(err) = self.reader.await {
            warn!(error = %err, "reader task ended abnormally");
        }
        if let Err(err) = self.writer.await {
            warn!(error = %err, "writer task ended abnormally");
        }
    }
}

/// Connect to a radio bridge and start an engine on it.
pub async fn connect(
    endpoint: &Endpoint,
    registry: Arc<CommandRegistry>,
    config: EngineConfig,
) -> Result<Connection> {
    let (engine, outbound) = Engine::new(registry, config)?;
    let stream = connect_async(endpoint).await?;
    info!(%endpoint, transport = endpoint.transport_name(), "connected to radio");
    Ok(spawn(engine, outbound, stream))
}

/// Run `engine` over `stream`. Must be called within a tokio runtime.
pub fn spawn<S>(engine: Engine, outbound: Outbound, stream: S) -> Connection
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let cancel = CancellationToken::new();

    let reader = tokio::spawn(read_loop(engine.clone(), read_half, cancel.clone()));
    let writer = tokio::spawn(write_loop(
        engine.clone(),
        outbound,
        write_half,
        cancel.clone(),
    ));

    Connection {
        engine,
        cancel,
        reader,
        writer,
    }
}

async fn read_loop<R>(engine: Engine, mut reader: R, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; engine.config().read_chunk_size];
    let mut sweep = tokio::time::interval(engine.config().sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sweep.tick() => {
                let expired = engine.sweep_expired();
                if expired > 0 {
                    debug!(expired, "swept expired waiters");
                }
            }
            read = reader.read(&mut chunk) => match read {
                Ok(0) => {
                    info!("radio stream closed");
                    break;
                }
                Ok(n) => {
                    let report = engine.on_bytes(&chunk[..n]);
                    trace!(bytes = n, ?report, "processed inbound chunk");
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(error = %err, "radio stream read failed");
                    break;
                }
            },
        }
    }

    cancel.cancel();
    engine.shutdown();
}

async fn write_loop<W>(engine: Engine, mut outbound: Outbound, writer: W, cancel: CancellationToken)
where
    W: AsyncWrite + Unpin,
{
    let max_payload = engine.registry().config().max_payload_size;
    let mut sink = FramedWrite::new(writer, UnpiCodec::with_max_payload(max_payload));

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            frame = outbound.next_frame() => frame,
        };
        let Some(frame) = next else { break };

        trace!(
            kind = %frame.kind,
            subsystem = %frame.subsystem,
            command = frame.command,
            len = frame.payload.len(),
            "writing frame"
        );
        if let Err(err) = sink.send(frame).await {
            warn!(error = %err, "radio stream write failed");
            break;
        }
    }

    if let Err(err) = SinkExt::<Frame>::close(&mut sink).await {
        debug!(error = %err, "closing radio stream writer failed");
    }
    cancel.cancel();
    engine.shutdown();
}
