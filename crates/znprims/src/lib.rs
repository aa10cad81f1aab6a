//! Serial primitives for Z-Stack ZNP radios.
//!
//! znprims speaks the UNPI framing used by Texas Instruments Zigbee network
//! processors, decodes every frame into a typed command, and correlates
//! requests with their asynchronous replies.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream endpoints for serial bridges (UDS, TCP)
//! - [`frame`]: UNPI frame codec with stream resynchronisation
//! - [`registry`]: Command catalog, field codecs and address modes
//! - [`engine`]: Transaction engine (behind `engine` feature)

/// Re-export transport types.
pub mod transport {
    pub use znprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use znprims_frame::*;
}

/// Re-export registry types.
pub mod registry {
    pub use znprims_registry::*;
}

/// Re-export engine types (requires `engine` feature).
#[cfg(feature = "engine")]
pub mod engine {
    pub use znprims_engine::*;
}
