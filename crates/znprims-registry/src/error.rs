use znprims_frame::Subsystem;

use crate::address::AddressMode;
use crate::definition::CommandIdentity;

/// Errors raised while loading definitions or building commands by name.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two definitions in one subsystem share a name.
    #[error("duplicate command name {subsystem} {name}")]
    DuplicateName {
        subsystem: Subsystem,
        name: &'static str,
    },

    /// Two definitions claim the same wire identity.
    #[error("duplicate command identity {0}")]
    DuplicateIdentity(CommandIdentity),

    /// A definition's field list is inconsistent.
    #[error("invalid definition {command}: {reason}")]
    InvalidDefinition {
        command: &'static str,
        reason: String,
    },

    /// No definition with this name.
    #[error("unknown command {kind} {subsystem} {name}")]
    NotFound {
        kind: znprims_frame::CommandType,
        subsystem: Subsystem,
        name: String,
    },

    /// A JSON field value could not be converted.
    #[error("field {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The JSON field map is not an object.
    #[error("field map must be a JSON object")]
    NotAnObject,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A command could not be encoded; nothing reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("no definition for {0}")]
    UnknownCommand(CommandIdentity),

    #[error("{command}: missing field {field}")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },

    #[error("{command}: field {field} is not declared")]
    UnknownField {
        command: &'static str,
        field: String,
    },

    #[error("field {field}: expected {expected}, found {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field {field}: declared length {declared} but data is {actual} long")]
    LengthMismatch {
        field: &'static str,
        declared: u64,
        actual: usize,
    },

    #[error("field {field}: value {value} does not fit (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("field {field}: {mode} address cannot be encoded in this slot")]
    AddressNotRepresentable {
        field: &'static str,
        mode: AddressMode,
    },

    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// An inbound payload did not match its definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no definition for {0}")]
    UnknownCommand(CommandIdentity),

    #[error("{command}: payload truncated at field {field} (needed {needed}, {available} left)")]
    Truncated {
        command: &'static str,
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{command}: {extra} trailing bytes after last field")]
    TrailingBytes { command: &'static str, extra: usize },

    #[error("{command}: field {field} has unrecognised address mode 0x{mode:02x}")]
    BadAddressMode {
        command: &'static str,
        field: &'static str,
        mode: u8,
    },

    #[error("{command}: field {field} has non-broadcast value 0x{value:04x} in broadcast mode")]
    BadBroadcastAddress {
        command: &'static str,
        field: &'static str,
        value: u16,
    },
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
