use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::address::{Address, AddressError};
use crate::error::{DecodeError, EncodeError};
use crate::value::Value;

/// Wire codec for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    /// 16-bit network address; encodes like `U16`, displays in hex.
    Nwk,
    /// 8-byte extended address.
    Ieee,
    /// Byte string sized by an earlier integer field.
    Buffer,
    /// Byte string of exactly this many bytes.
    FixedBuffer(usize),
    /// Bytes counted by an earlier integer field.
    ListU8,
    /// Little-endian u16 values counted by an earlier integer field.
    ListU16,
    /// Mode byte plus a body sized by the mode.
    Address,
    /// Mode byte plus a two-byte slot.
    AddressShort,
    /// Mode byte plus an eight-byte slot.
    AddressWide,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::U8 => "u8",
            FieldKind::U16 => "u16",
            FieldKind::U32 => "u32",
            FieldKind::Nwk => "nwk",
            FieldKind::Ieee => "ieee",
            FieldKind::Buffer => "buffer",
            FieldKind::FixedBuffer(_) => "fixed buffer",
            FieldKind::ListU8 => "list<u8>",
            FieldKind::ListU16 => "list<u16>",
            FieldKind::Address => "address",
            FieldKind::AddressShort => "address (2-byte slot)",
            FieldKind::AddressWide => "address (8-byte slot)",
        }
    }

    /// Smallest encoding of this field.
    pub fn min_size(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 | FieldKind::Nwk => 2,
            FieldKind::U32 => 4,
            FieldKind::Ieee => 8,
            FieldKind::Buffer | FieldKind::ListU8 | FieldKind::ListU16 => 0,
            FieldKind::FixedBuffer(len) => len,
            FieldKind::Address | FieldKind::AddressShort => 3,
            FieldKind::AddressWide => 9,
        }
    }

    /// Integer kinds may serve as length fields.
    pub fn is_integer(self) -> bool {
        matches!(self, FieldKind::U8 | FieldKind::U16 | FieldKind::U32)
    }

    /// Kinds whose size comes from a length field.
    pub fn is_measured(self) -> bool {
        matches!(
            self,
            FieldKind::Buffer | FieldKind::ListU8 | FieldKind::ListU16
        )
    }

    pub(crate) fn integer_max(self) -> Option<u64> {
        match self {
            FieldKind::U8 => Some(u64::from(u8::MAX)),
            FieldKind::U16 | FieldKind::Nwk => Some(u64::from(u16::MAX)),
            FieldKind::U32 => Some(u64::from(u32::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::FixedBuffer(len) => write!(f, "buffer[{len}]"),
            other => f.write_str(other.name()),
        }
    }
}

/// One named field in a command's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Earlier field holding this field's byte length or element count.
    pub length_ref: Option<&'static str>,
}

impl FieldDef {
    const fn plain(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            length_ref: None,
        }
    }

    pub const fn u8(name: &'static str) -> Self {
        Self::plain(name, FieldKind::U8)
    }

    pub const fn u16(name: &'static str) -> Self {
        Self::plain(name, FieldKind::U16)
    }

    pub const fn u32(name: &'static str) -> Self {
        Self::plain(name, FieldKind::U32)
    }

    pub const fn nwk(name: &'static str) -> Self {
        Self::plain(name, FieldKind::Nwk)
    }

    pub const fn ieee(name: &'static str) -> Self {
        Self::plain(name, FieldKind::Ieee)
    }

    pub const fn fixed(name: &'static str, len: usize) -> Self {
        Self::plain(name, FieldKind::FixedBuffer(len))
    }

    pub const fn address(name: &'static str) -> Self {
        Self::plain(name, FieldKind::Address)
    }

    pub const fn address_short(name: &'static str) -> Self {
        Self::plain(name, FieldKind::AddressShort)
    }

    pub const fn address_wide(name: &'static str) -> Self {
        Self::plain(name, FieldKind::AddressWide)
    }

    pub const fn buffer(name: &'static str, length: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Buffer,
            length_ref: Some(length),
        }
    }

    pub const fn list_u8(name: &'static str, count: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::ListU8,
            length_ref: Some(count),
        }
    }

    pub const fn list_u16(name: &'static str, count: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::ListU16,
            length_ref: Some(count),
        }
    }
}

pub(crate) fn encode_field(def: &FieldDef, value: &Value, dst: &mut BytesMut) -> Result<(), EncodeError> {
    let wrong_type = || EncodeError::WrongType {
        field: def.name,
        expected: def.kind.name(),
        found: value.type_name(),
    };

    if let Some(max) = def.kind.integer_max() {
        let raw = value.as_u64().ok_or_else(wrong_type)?;
        if raw > max {
            return Err(EncodeError::OutOfRange {
                field: def.name,
                value: raw,
                max,
            });
        }
        match def.kind {
            FieldKind::U8 => dst.put_u8(raw as u8),
            FieldKind::U32 => dst.put_u32_le(raw as u32),
            _ => dst.put_u16_le(raw as u16),
        }
        return Ok(());
    }

    match (def.kind, value) {
        (FieldKind::Ieee, Value::Ieee(ieee)) => dst.put_slice(ieee.wire_bytes()),
        (FieldKind::Buffer, Value::Bytes(bytes)) => dst.put_slice(bytes),
        (FieldKind::FixedBuffer(len), Value::Bytes(bytes)) => {
            if bytes.len() != len {
                return Err(EncodeError::LengthMismatch {
                    field: def.name,
                    declared: len as u64,
                    actual: bytes.len(),
                });
            }
            dst.put_slice(bytes);
        }
        (FieldKind::ListU8, Value::ListU8(items)) => dst.put_slice(items),
        (FieldKind::ListU16, Value::ListU16(items)) => {
            for item in items {
                dst.put_u16_le(*item);
            }
        }
        (FieldKind::Address, Value::Address(address)) => address.write(dst),
        (FieldKind::AddressShort, Value::Address(address)) => address
            .write_short(dst)
            .map_err(|_| not_representable(def, address))?,
        (FieldKind::AddressWide, Value::Address(address)) => address
            .write_wide(dst)
            .map_err(|_| not_representable(def, address))?,
        _ => return Err(wrong_type()),
    }
    Ok(())
}

fn not_representable(def: &FieldDef, address: &Address) -> EncodeError {
    EncodeError::AddressNotRepresentable {
        field: def.name,
        mode: address.mode(),
    }
}

/// Decode one field. `count` is the resolved length reference for measured
/// kinds and ignored otherwise.
pub(crate) fn decode_field(
    command: &'static str,
    def: &FieldDef,
    src: &mut Bytes,
    count: usize,
) -> Result<Value, DecodeError> {
    let needed = match def.kind {
        FieldKind::Buffer | FieldKind::ListU8 => count,
        FieldKind::ListU16 => count.saturating_mul(2),
        FieldKind::Address => 1,
        other => other.min_size(),
    };
    if src.remaining() < needed {
        return Err(DecodeError::Truncated {
            command,
            field: def.name,
            needed,
            available: src.remaining(),
        });
    }

    let value = match def.kind {
        FieldKind::U8 => Value::U8(src.get_u8()),
        FieldKind::U16 | FieldKind::Nwk => Value::U16(src.get_u16_le()),
        FieldKind::U32 => Value::U32(src.get_u32_le()),
        FieldKind::Ieee => {
            let mut bytes = [0u8; 8];
            src.copy_to_slice(&mut bytes);
            Value::Ieee(crate::address::Eui64(bytes))
        }
        FieldKind::Buffer => Value::Bytes(src.split_to(count)),
        FieldKind::FixedBuffer(len) => Value::Bytes(src.split_to(len)),
        FieldKind::ListU8 => Value::ListU8(src.split_to(count).to_vec()),
        FieldKind::ListU16 => Value::ListU16((0..count).map(|_| src.get_u16_le()).collect()),
        FieldKind::Address => {
            let mode = src.get_u8();
            Value::Address(
                Address::parse(mode, src).map_err(|err| address_error(command, def, mode, err))?,
            )
        }
        FieldKind::AddressShort => {
            let mode = src[0];
            Value::Address(
                Address::read_short(src).map_err(|err| address_error(command, def, mode, err))?,
            )
        }
        FieldKind::AddressWide => {
            let mode = src[0];
            Value::Address(
                Address::read_wide(src).map_err(|err| address_error(command, def, mode, err))?,
            )
        }
    };
    Ok(value)
}

fn address_error(command: &'static str, def: &FieldDef, mode: u8, err: AddressError) -> DecodeError {
    match err {
        AddressError::BadBroadcast(value) => DecodeError::BadBroadcastAddress {
            command,
            field: def.name,
            value,
        },
        AddressError::Truncated { needed, available } => DecodeError::Truncated {
            command,
            field: def.name,
            needed,
            available,
        },
        _ => DecodeError::BadAddressMode {
            command,
            field: def.name,
            mode,
        },
    }
}

/// Bytes `value` occupies when encoded as `kind`.
pub(crate) fn encoded_len(kind: FieldKind, value: &Value) -> usize {
    match (kind, value) {
        (FieldKind::Address, Value::Address(address)) => 1 + address.body_len(),
        (FieldKind::Buffer | FieldKind::FixedBuffer(_), Value::Bytes(bytes)) => bytes.len(),
        (FieldKind::ListU8, Value::ListU8(items)) => items.len(),
        (FieldKind::ListU16, Value::ListU16(items)) => items.len() * 2,
        (other, _) => other.min_size(),
    }
}

/// Field value as shown in command descriptions.
pub(crate) struct Shown<'a>(pub FieldKind, pub &'a Value);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0, self.1) {
            (FieldKind::Nwk, Value::U16(nwk)) => write!(f, "0x{nwk:04x}"),
            (_, value) => write!(f, "{value}"),
        }
    }
}
