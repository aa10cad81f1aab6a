use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Serialize, Serializer};

use crate::address::{Address, Eui64};
use crate::field::FieldKind;

/// One decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    Ieee(Eui64),
    Bytes(Bytes),
    ListU8(Vec<u8>),
    ListU16(Vec<u16>),
    Address(Address),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::Ieee(_) => "ieee",
            Value::Bytes(_) => "bytes",
            Value::ListU8(_) => "list<u8>",
            Value::ListU16(_) => "list<u16>",
            Value::Address(_) => "address",
        }
    }

    /// Integer view, for length fields and match constraints.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(v) => Some(u64::from(*v)),
            Value::U16(v) => Some(u64::from(*v)),
            Value::U32(v) => Some(u64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Value::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn as_ieee(&self) -> Option<Eui64> {
        match self {
            Value::Ieee(ieee) => Some(*ieee),
            _ => None,
        }
    }

    /// Element count of a buffer or list; what a length field describes.
    pub(crate) fn measured_len(&self) -> Option<usize> {
        match self {
            Value::Bytes(bytes) => Some(bytes.len()),
            Value::ListU8(items) => Some(items.len()),
            Value::ListU16(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Whether two values describe the same thing, treating integers of
    /// different widths as equal when their numeric values are.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self.as_u64(), other.as_u64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Convert a JSON value into the value a field of `kind` expects.
    ///
    /// Integers accept numbers or `0x` strings; buffers accept hex strings or
    /// byte arrays; addresses accept their text form or a bare number.
    pub fn from_json(kind: FieldKind, json: &serde_json::Value) -> Result<Value, String> {
        use serde_json::Value as Json;

        match kind {
            FieldKind::U8 => json_int(json, u64::from(u8::MAX)).map(|v| Value::U8(v as u8)),
            FieldKind::U16 | FieldKind::Nwk => {
                json_int(json, u64::from(u16::MAX)).map(|v| Value::U16(v as u16))
            }
            FieldKind::U32 => json_int(json, u64::from(u32::MAX)).map(|v| Value::U32(v as u32)),
            FieldKind::Ieee => match json {
                Json::String(text) => text.parse().map(Value::Ieee).map_err(|e| e.to_string()),
                _ => Err("expected an extended address string".to_string()),
            },
            FieldKind::Buffer | FieldKind::FixedBuffer(_) => json_bytes(json).map(Value::Bytes),
            FieldKind::ListU8 => json_list(json, u64::from(u8::MAX))
                .map(|items| Value::ListU8(items.into_iter().map(|v| v as u8).collect())),
            FieldKind::ListU16 => json_list(json, u64::from(u16::MAX))
                .map(|items| Value::ListU16(items.into_iter().map(|v| v as u16).collect())),
            FieldKind::Address | FieldKind::AddressShort | FieldKind::AddressWide => match json {
                Json::String(text) => text
                    .parse()
                    .map(Value::Address)
                    .map_err(|e: crate::address::AddressError| e.to_string()),
                Json::Number(_) => json_int(json, u64::from(u16::MAX))
                    .map(|v| Value::Address(Address::Nwk(v as u16))),
                _ => Err("expected an address string or network address".to_string()),
            },
        }
    }
}

fn json_int(json: &serde_json::Value, max: u64) -> Result<u64, String> {
    let value = match json {
        serde_json::Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| format!("{number} is not an unsigned integer"))?,
        serde_json::Value::String(text) => parse_int(text)?,
        other => return Err(format!("expected an integer, found {other}")),
    };
    if value > max {
        return Err(format!("{value} exceeds {max}"));
    }
    Ok(value)
}

fn parse_int(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("{text:?} is not an integer"))
}

fn json_list(json: &serde_json::Value, max: u64) -> Result<Vec<u64>, String> {
    match json {
        serde_json::Value::Array(items) => items.iter().map(|item| json_int(item, max)).collect(),
        _ => Err("expected an array of integers".to_string()),
    }
}

fn json_bytes(json: &serde_json::Value) -> Result<Bytes, String> {
    match json {
        serde_json::Value::String(text) => decode_hex(text).map(Bytes::from),
        serde_json::Value::Array(_) => json_list(json, u64::from(u8::MAX))
            .map(|items| items.into_iter().map(|v| v as u8).collect::<Vec<u8>>().into()),
        _ => Err("expected a hex string or byte array".to_string()),
    }
}

/// Decode hex, ignoring an optional `0x` prefix and embedded whitespace.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let text = text.strip_prefix("0x").unwrap_or(text);
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("hex string has an odd number of digits".to_string());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).map_err(|_| "hex string is not ASCII")?;
            u8::from_str_radix(pair, 16).map_err(|_| "invalid hex digit")
        })
        .collect::<Result<Vec<u8>, &str>>()
        .map_err(str::to_string)
}

/// Lowercase hex without separators.
pub fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::Ieee(ieee) => write!(f, "{ieee}"),
            Value::Bytes(bytes) => write!(f, "0x{}", encode_hex(bytes)),
            Value::ListU8(items) => write!(f, "{items:?}"),
            Value::ListU16(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "0x{item:04x}")?;
                }
                f.write_str("]")
            }
            Value::Address(address) => write!(f, "{address}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::Ieee(ieee) => ieee.serialize(serializer),
            Value::Bytes(bytes) => serializer.serialize_str(&encode_hex(bytes)),
            Value::ListU8(items) => items.serialize(serializer),
            Value::ListU16(items) => items.serialize(serializer),
            Value::Address(address) => Serialize::serialize(address, serializer),
        }
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::U8(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::U16(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::U32(value)
    }
}

impl From<Eui64> for Value {
    fn from(value: Eui64) -> Self {
        Value::Ieee(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value)
    }
}

impl From<&'static [u8]> for Value {
    fn from(value: &'static [u8]) -> Self {
        Value::Bytes(Bytes::from_static(value))
    }
}

impl From<Vec<u16>> for Value {
    fn from(value: Vec<u16>) -> Self {
        Value::ListU16(value)
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Value::Address(value)
    }
}

/// Field name to value mapping handed to [`CommandRegistry::build`](crate::CommandRegistry::build).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(BTreeMap<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
