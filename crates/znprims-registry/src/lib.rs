//! Command definitions for the Z-Stack network processor interface.
//!
//! A [`CommandRegistry`] maps each command identity (type, subsystem, id) to an
//! ordered list of typed fields. The same table drives outbound construction
//! ([`CommandRegistry::build`]) and inbound parsing ([`CommandRegistry::parse`]),
//! so both directions agree on the wire layout by construction.
//!
//! Tables are validated when they are registered: length references, field
//! name uniqueness and the minimum payload size are checked once instead of on
//! every frame.

pub mod address;
pub mod catalog;
pub mod command;
pub mod config;
pub mod definition;
pub mod error;
pub mod field;
pub mod registry;
pub mod status;
pub mod value;

pub use address::{Address, AddressError, AddressMode, BroadcastAddress, Eui64};
pub use command::Command;
pub use config::RegistryConfig;
pub use definition::{CommandDefinition, CommandIdentity, DefinitionKind, Layout};
pub use error::{DecodeError, EncodeError, RegistryError, Result};
pub use field::{FieldDef, FieldKind};
pub use registry::CommandRegistry;
pub use status::{status_message, status_name};
pub use value::{decode_hex, encode_hex, FieldMap, Value};

pub use znprims_frame::{CommandType, Frame, Subsystem};
