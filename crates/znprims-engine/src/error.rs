use std::time::Duration;

use znprims_frame::FrameError;
use znprims_registry::{DecodeError, EncodeError, RegistryError};
use znprims_transport::TransportError;

/// Errors from the transaction engine and the request helpers built on it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("engine is shut down")]
    Shutdown,

    #[error("outbound stream closed")]
    Closed,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The radio refused the request in its synchronous response.
    #[error("radio rejected request: {message}")]
    Rejected { code: u8, message: String },

    /// The radio answered, but not with something usable.
    #[error("unusable reply: {0}")]
    NoReply(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
