use std::time::Duration;

use crate::error::{EngineError, Result};

/// Tuning for a transaction engine.
///
/// The defaults match the radio's behaviour on a quiet network: one request
/// in flight at a time, ten seconds for an asynchronous reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Requests allowed in flight at once.
    pub max_in_flight: usize,
    /// How long a waiter stays registered before it expires.
    pub reply_timeout: Duration,
    /// How long synchronous calls (SREQ to SRSP) wait.
    pub srsp_timeout: Duration,
    /// How long a resolved or expired waiter is remembered, so that late
    /// repeats of its reply are recognised and dropped.
    pub duplicate_window: Duration,
    /// Upper bound on remembered waiters.
    pub max_tombstones: usize,
    /// Frames queued for the writer before `send` applies backpressure.
    pub outbound_capacity: usize,
    /// Interval for the connection's background expiry sweep.
    pub sweep_interval: Duration,
    /// Bytes requested per read from the radio stream.
    pub read_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            reply_timeout: Duration::from_secs(10),
            srsp_timeout: Duration::from_secs(6),
            duplicate_window: Duration::from_secs(2),
            max_tombstones: 32,
            outbound_capacity: 16,
            sweep_interval: Duration::from_millis(250),
            read_chunk_size: 256,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(EngineError::InvalidConfig(reason.to_string()));

        if self.max_in_flight == 0 {
            return invalid("max_in_flight must be at least 1");
        }
        if self.max_in_flight > tokio::sync::Semaphore::MAX_PERMITS {
            return invalid("max_in_flight is larger than the gate supports");
        }
        if self.reply_timeout.is_zero() || self.srsp_timeout.is_zero() {
            return invalid("timeouts must be non-zero");
        }
        if self.sweep_interval.is_zero() {
            return invalid("sweep_interval must be non-zero");
        }
        if self.outbound_capacity == 0 {
            return invalid("outbound_capacity must be at least 1");
        }
        if self.read_chunk_size == 0 {
            return invalid("read_chunk_size must be at least 1");
        }
        Ok(())
    }
}
