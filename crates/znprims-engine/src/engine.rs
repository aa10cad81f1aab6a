use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use znprims_frame::{DecodeStats, Frame, FrameDecoder};
use znprims_registry::{Command, CommandIdentity, CommandRegistry, CommandType, DecodeError};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::matcher::Match;
use crate::sequence::SequenceCounter;
use crate::waiter::{Claim, Outcome, Registration, WaiterTable};

type DispatchFn = dyn Fn(Inbound) + Send + Sync;

/// An inbound frame no waiter claimed.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Command(Command),
    /// The frame's identity is unknown, or its payload did not match its
    /// definition.
    Undecodable { frame: Frame, error: DecodeError },
}

/// What one [`Engine::on_bytes`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Complete frames decoded.
    pub frames: usize,
    /// Waiters resolved with a reply.
    pub resolved: usize,
    /// Waiters failed by a malformed reply.
    pub failed: usize,
    /// Frames handed to the dispatch callback.
    pub dispatched: usize,
    /// Late repeats of already-answered replies that were dropped.
    pub duplicates: usize,
    /// Corrupt frames skipped while resynchronising.
    pub framing_errors: u64,
}

/// Correlates outbound requests with inbound replies.
///
/// The engine never touches the byte stream itself. Outbound frames are
/// queued for whoever holds the [`Outbound`] half; inbound bytes are pushed
/// in with [`on_bytes`](Engine::on_bytes). [`crate::connection`] wires both to
/// a real stream.
///
/// Cloning is cheap and every clone drives the same engine.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

struct Shared {
    registry: Arc<CommandRegistry>,
    config: EngineConfig,
    waiters: Mutex<WaiterTable>,
    gate: Arc<Semaphore>,
    sequence: SequenceCounter,
    decoder: Mutex<FrameDecoder>,
    dispatch: RwLock<Option<Arc<DispatchFn>>>,
    outbound: mpsc::Sender<Frame>,
    shutdown: CancellationToken,
}

impl Shared {
    fn waiters(&self) -> MutexGuard<'_, WaiterTable> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decoder(&self) -> MutexGuard<'_, FrameDecoder> {
        self.decoder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Engine {
    /// Create an engine and the queue its outbound frames appear on.
    pub fn new(registry: Arc<CommandRegistry>, config: EngineConfig) -> Result<(Self, Outbound)> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.outbound_capacity);
        let shutdown = CancellationToken::new();
        let max_payload = registry.config().max_payload_size;

        let shared = Shared {
            waiters: Mutex::new(WaiterTable::new(
                config.duplicate_window,
                config.max_tombstones,
            )),
            gate: Arc::new(Semaphore::new(config.max_in_flight)),
            sequence: SequenceCounter::new(),
            decoder: Mutex::new(FrameDecoder::with_max_payload(max_payload)),
            dispatch: RwLock::new(None),
            outbound: sender,
            shutdown: shutdown.clone(),
            registry,
            config,
        };
        let outbound = Outbound { receiver, shutdown };
        Ok((
            Self {
                shared: Arc::new(shared),
            },
            outbound,
        ))
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.shared.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Install the callback that receives unclaimed inbound frames.
    ///
    /// Runs on the task feeding [`on_bytes`](Engine::on_bytes); it must not
    /// block.
    pub fn set_dispatch<F>(&self, callback: F)
    where
        F: Fn(Inbound) + Send + Sync + 'static,
    {
        let mut slot = self
            .shared
            .dispatch
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(callback));
    }

    pub fn clear_dispatch(&self) {
        let mut slot = self
            .shared
            .dispatch
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Send `command` and register a waiter for the reply `predicate`
    /// describes.
    ///
    /// Waits for a free in-flight slot first; the slot stays taken until the
    /// waiter resolves, expires or is cancelled. The command is tagged with a
    /// fresh sequence number, and a `predicate` built with
    /// [`Match::with_sequence`] is bound to that number. The waiter exists
    /// before the frame is queued, so a fast reply cannot be missed.
    pub async fn send(&self, command: Command, predicate: Match) -> Result<Handle> {
        let permit = self.acquire_gate().await?;

        let tsn = self.shared.sequence.next();
        let command = command.with_sequence(tsn);
        let origin = (command.kind() == CommandType::Sreq).then(|| command.identity());
        let handle = self.register_waiter(
            Registration {
                predicate: predicate.bind_sequence(tsn),
                origin,
                timeout: self.shared.config.reply_timeout,
                permit: Some(permit),
            },
            Some(tsn),
        )?;

        debug!(%command, waiter = handle.id, "sending request");
        if let Err(err) = self.write(&command).await {
            let withdrawn = self.shared.waiters().remove(handle.id, false, Instant::now());
            drop(withdrawn);
            return Err(err);
        }
        Ok(handle)
    }

    /// Send `command` without expecting a reply.
    ///
    /// Still takes an in-flight slot while the frame is queued, so it is
    /// ordered with respect to gated requests. Returns the command as sent.
    pub async fn post(&self, command: Command) -> Result<Command> {
        let _permit = self.acquire_gate().await?;
        let command = command.with_sequence(self.shared.sequence.next());
        debug!(%command, "posting request without reply");
        self.write(&command).await?;
        Ok(command)
    }

    /// Wait for an unsolicited frame. Not gated and nothing is sent.
    pub fn register(&self, predicate: Match) -> Result<Handle> {
        self.sweep_expired();
        self.register_waiter(
            Registration {
                predicate,
                origin: None,
                timeout: self.shared.config.reply_timeout,
                permit: None,
            },
            None,
        )
    }

    /// [`send`](Engine::send), then wait up to `timeout` for the reply.
    pub async fn request(&self, command: Command, predicate: Match, timeout: Duration) -> Result<Outcome> {
        let handle = self.send(command, predicate).await?;
        Ok(handle.wait(timeout).await)
    }

    /// Send a synchronous request and return its SRSP.
    pub async fn call(&self, command: Command) -> Result<Command> {
        let timeout = self.shared.config.srsp_timeout;
        let predicate = Match::reply_to(&command);
        let outcome = self.request(command, predicate, timeout).await?;
        reply(outcome, timeout)
    }

    /// Feed bytes received from the radio.
    ///
    /// Decodes every complete frame, resolves the first matching waiter for
    /// each and hands the rest to the dispatch callback. Never blocks.
    pub fn on_bytes(&self, bytes: &[u8]) -> FeedReport {
        let mut report = FeedReport::default();
        if self.is_shut_down() {
            debug!(len = bytes.len(), "engine shut down; dropping inbound bytes");
            return report;
        }

        let frames: Vec<Frame> = {
            let mut decoder = self.shared.decoder();
            let before = decoder.stats().framing_errors;
            decoder.extend(bytes);
            let frames = std::iter::from_fn(|| decoder.decode_next()).collect();
            report.framing_errors = decoder.stats().framing_errors - before;
            frames
        };

        self.sweep_expired();
        for frame in frames {
            report.frames += 1;
            self.handle_frame(frame, &mut report);
        }
        report
    }

    fn handle_frame(&self, frame: Frame, report: &mut FeedReport) {
        let now = Instant::now();
        let command = match self.shared.registry.parse(&frame) {
            Ok(command) => command,
            Err(error) => return self.handle_undecodable(frame, error, now, report),
        };
        trace!(%command, "received");

        let claim = self.shared.waiters().claim(&command, now);
        match claim {
            Claim::Waiter(waiter) => {
                debug!(%command, waiter = waiter.id, "reply matched waiter");
                report.resolved += 1;
                waiter.resolve(Outcome::Resolved(command));
            }
            Claim::Duplicate => {
                debug!(%command, "probably duplicate response; ignoring");
                report.duplicates += 1;
            }
            Claim::Unclaimed => {
                if command.layout().is_confirm() {
                    warn!(tsn = ?command.sequence(), %command, "unexpected transmit confirm for request id");
                }
                report.dispatched += 1;
                self.dispatch(Inbound::Command(command));
            }
        }
    }

    fn handle_undecodable(&self, frame: Frame, error: DecodeError, now: Instant, report: &mut FeedReport) {
        let identity = CommandIdentity::new(frame.kind, frame.subsystem, frame.command);
        if let Some(name) = self.shared.registry.lookup(identity).map(|layout| layout.name) {
            let claimed = self
                .shared
                .waiters()
                .claim_failed(frame.kind, frame.subsystem, name, now);
            if let Some(waiter) = claimed {
                warn!(%error, waiter = waiter.id, "reply failed to decode; failing waiter");
                report.failed += 1;
                waiter.resolve(Outcome::Failed(error));
                return;
            }
        }

        match error {
            DecodeError::UnknownCommand(_) => debug!(%error, "frame has no definition"),
            _ => warn!(%error, "undecodable frame"),
        }
        report.dispatched += 1;
        self.dispatch(Inbound::Undecodable { frame, error });
    }

    fn dispatch(&self, inbound: Inbound) {
        let callback = self
            .shared
            .dispatch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => callback(inbound),
            None => trace!(?inbound, "no dispatch callback installed"),
        }
    }

    /// Expire waiters past their deadline. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let expired = self.shared.waiters().expire(Instant::now());
        let count = expired.len();
        for waiter in expired {
            debug!(waiter = waiter.id, predicate = %waiter.predicate, "waiter expired");
            waiter.resolve(Outcome::TimedOut);
        }
        count
    }

    /// Cancel every waiter and refuse further requests. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
        self.shared.gate.close();

        let drained = {
            let mut table = self.shared.waiters();
            if table.is_closed() {
                return;
            }
            table.drain()
        };
        info!(cancelled = drained.len(), "transaction engine shut down");
        for waiter in drained {
            waiter.resolve(Outcome::Cancelled);
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Waiters still registered.
    pub fn pending(&self) -> usize {
        self.shared.waiters().len()
    }

    /// Sequence number the next request will carry.
    pub fn next_sequence(&self) -> u8 {
        self.shared.sequence.peek()
    }

    pub fn decode_stats(&self) -> DecodeStats {
        self.shared.decoder().stats()
    }

    async fn acquire_gate(&self) -> Result<OwnedSemaphorePermit> {
        let acquire = Arc::clone(&self.shared.gate).acquire_owned();
        tokio::pin!(acquire);
        loop {
            // Expired waiters hold slots; sweep while queued so they free up
            // even when nothing else is driving the engine.
            self.sweep_expired();
            tokio::select! {
                permit = &mut acquire => return permit.map_err(|_| EngineError::Shutdown),
                _ = tokio::time::sleep(self.shared.config.sweep_interval) => {}
            }
        }
    }

    fn register_waiter(&self, registration: Registration, sequence: Option<u8>) -> Result<Handle> {
        let inserted = self.shared.waiters().insert(registration, Instant::now());
        let (id, receiver) = inserted.ok_or(EngineError::Shutdown)?;
        Ok(Handle {
            id,
            sequence,
            receiver,
            shared: Arc::clone(&self.shared),
        })
    }

    async fn write(&self, command: &Command) -> Result<()> {
        if self.is_shut_down() {
            return Err(EngineError::Shutdown);
        }
        let frame = command.to_frame();
        tokio::select! {
            biased;
            _ = self.shared.shutdown.cancelled() => Err(EngineError::Shutdown),
            sent = self.shared.outbound.send(frame) => sent.map_err(|_| EngineError::Closed),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .field("pending", &self.pending())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Turn the outcome of a request into the reply or an error.
pub(crate) fn reply(outcome: Outcome, waited: Duration) -> Result<Command> {
    match outcome {
        Outcome::Resolved(command) => Ok(command),
        Outcome::Failed(err) => Err(err.into()),
        Outcome::TimedOut => Err(EngineError::Timeout(waited)),
        Outcome::Cancelled => Err(EngineError::Shutdown),
    }
}

/// A registered waiter.
///
/// Dropping the handle withdraws the waiter and frees its in-flight slot.
pub struct Handle {
    id: u64,
    sequence: Option<u8>,
    receiver: oneshot::Receiver<Outcome>,
    shared: Arc<Shared>,
}

impl Handle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Sequence number the request was sent with.
    pub fn sequence(&self) -> Option<u8> {
        self.sequence
    }

    /// Wait up to `timeout` for the outcome.
    ///
    /// Timing out only withdraws this waiter; other waiters are unaffected.
    pub async fn wait(mut self, timeout: Duration) -> Outcome {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Outcome::Cancelled,
            Err(_) => self.give_up(),
        }
    }

    fn give_up(&mut self) -> Outcome {
        let withdrawn = self.shared.waiters().remove(self.id, true, Instant::now());
        match withdrawn {
            Some(waiter) => {
                debug!(waiter = self.id, predicate = %waiter.predicate, "gave up waiting for reply");
                Outcome::TimedOut
            }
            // Resolved between the deadline and taking the lock.
            None => self.receiver.try_recv().unwrap_or(Outcome::TimedOut),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let _withdrawn = self.shared.waiters().remove(self.id, false, Instant::now());
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Frames the engine wants written to the radio, in order.
#[derive(Debug)]
pub struct Outbound {
    receiver: mpsc::Receiver<Frame>,
    shutdown: CancellationToken,
}

impl Outbound {
    /// Next frame to write; `None` once the engine has shut down.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        let frame = if self.shutdown.is_cancelled() {
            None
        } else {
            tokio::select! {
                frame = self.receiver.recv() => frame,
                _ = self.shutdown.cancelled() => None,
            }
        };
        if frame.is_none() {
            self.receiver.close();
        }
        frame
    }

    /// Next frame, already encoded for the wire.
    pub async fn next_bytes(&mut self) -> Option<Bytes> {
        loop {
            let frame = self.next_frame().await?;
            match frame.to_bytes() {
                Ok(bytes) => return Some(bytes),
                Err(err) => warn!(error = %err, "dropping outbound frame that cannot be encoded"),
            }
        }
    }

    /// A queued frame, without waiting.
    pub fn try_next_frame(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }
}
