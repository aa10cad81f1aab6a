//! Transaction engine for Z-Stack network processors.
//!
//! The radio answers requests asynchronously, in whatever order it likes, and
//! interleaves unsolicited indications with replies. The [`Engine`] keeps an
//! ordered table of waiters and hands each inbound command to the first
//! waiter whose [`Match`] it satisfies; everything else goes to a dispatch
//! callback.
//!
//! Requests are numbered by a wrapping 1..=255 [`SequenceCounter`] and pass a
//! gate that limits how many are in flight at once (one, by default, which is
//! what the radio firmware tolerates).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use znprims_engine::{connect, probe, EngineConfig};
//! use znprims_registry::CommandRegistry;
//!
//! # async fn demo() -> znprims_engine::Result<()> {
//! let registry = Arc::new(CommandRegistry::builtin()?);
//! let endpoint = "tcp://192.168.1.20:6638".parse()?;
//! let connection = connect(&endpoint, registry, EngineConfig::default()).await?;
//! let info = probe(connection.engine(), std::time::Duration::from_secs(2)).await?;
//! println!("firmware {}", info.version_string());
//! connection.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod probe;
pub mod requests;
pub mod sequence;
pub mod waiter;

pub use config::EngineConfig;
pub use connection::{connect, spawn, Connection};
pub use engine::{Engine, FeedReport, Handle, Inbound, Outbound};
pub use error::{EngineError, Result};
pub use matcher::Match;
pub use probe::{probe, RadioInfo};
pub use requests::{DataRequest, Status};
pub use sequence::SequenceCounter;
pub use waiter::{Outcome, STATUS_FAILURE};
