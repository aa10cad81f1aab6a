//! Destination and source addressing.
//!
//! Every address travels as a mode byte followed by a body whose size is fixed
//! by the mode. Some commands reserve a fixed slot instead (two bytes for ZDO
//! management requests, eight for AF extended data requests); see
//! [`Address::write_short`] and [`Address::write_wide`].

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// IEEE 802.15.4 extended address, stored in wire (little-endian) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Eui64(pub [u8; 8]);

impl Eui64 {
    pub const fn from_wire(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value.to_le_bytes())
    }

    pub fn to_u64(self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    /// Bytes as they appear on the wire.
    pub fn wire_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Eui64 {
    type Err = AddressError;

    /// Accepts `00:12:4b:00:01:02:03:04` (most significant byte first) or
    /// `0x00124b0001020304`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::Parse {
            input: input.to_string(),
            reason: "expected eight colon-separated hex bytes or 0x plus 16 hex digits",
        };

        if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
            if hex.len() != 16 {
                return Err(invalid());
            }
            let value = u64::from_str_radix(hex, 16).map_err(|_| invalid())?;
            return Ok(Self::from_u64(value));
        }

        let mut bytes = [0u8; 8];
        let mut parts = input.split(':');
        for slot in bytes.iter_mut().rev() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Eui64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Eui64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Mode byte preceding an address body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressMode {
    NotPresent = 0,
    Group = 1,
    Nwk = 2,
    Ieee = 3,
    NwkAndIeee = 4,
    Broadcast = 15,
}

impl AddressMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::NotPresent),
            1 => Some(Self::Group),
            2 => Some(Self::Nwk),
            3 => Some(Self::Ieee),
            4 => Some(Self::NwkAndIeee),
            15 => Some(Self::Broadcast),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NotPresent => "not-present",
            Self::Group => "group",
            Self::Nwk => "nwk",
            Self::Ieee => "ieee",
            Self::NwkAndIeee => "nwk+ieee",
            Self::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reserved network addresses for broadcast delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum BroadcastAddress {
    AllDevices = 0xFFFF,
    RxOnWhenIdle = 0xFFFD,
    AllRoutersAndCoordinator = 0xFFFC,
    LowPowerRouters = 0xFFFB,
}

impl BroadcastAddress {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0xFFFF => Some(Self::AllDevices),
            0xFFFD => Some(Self::RxOnWhenIdle),
            0xFFFC => Some(Self::AllRoutersAndCoordinator),
            0xFFFB => Some(Self::LowPowerRouters),
            _ => None,
        }
    }

    pub fn value(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AllDevices => "all-devices",
            Self::RxOnWhenIdle => "rx-on-when-idle",
            Self::AllRoutersAndCoordinator => "all-routers-and-coordinator",
            Self::LowPowerRouters => "low-power-routers",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [
            Self::AllDevices,
            Self::RxOnWhenIdle,
            Self::AllRoutersAndCoordinator,
            Self::LowPowerRouters,
        ]
        .into_iter()
        .find(|candidate| candidate.name() == name)
    }
}

/// A destination or source address.
///
/// Equality is by variant and value: `Both(0x1234, ..)` never equals
/// `Nwk(0x1234)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// 16-bit network (short) address.
    Nwk(u16),
    /// 64-bit extended address.
    Ieee(Eui64),
    /// Both forms; always serialized in full.
    Both(u16, Eui64),
    /// Multicast group id.
    Group(u16),
    Broadcast(BroadcastAddress),
}

/// Address parsing and slot errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("unrecognised address mode 0x{0:02x}")]
    BadMode(u8),

    #[error("0x{0:04x} is not a broadcast address")]
    BadBroadcast(u16),

    #[error("address body truncated (needed {needed}, {available} left)")]
    Truncated { needed: usize, available: usize },

    #[error("{0} address does not fit this slot")]
    NotRepresentable(AddressMode),

    #[error("invalid address {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },
}

impl Address {
    pub fn mode(&self) -> AddressMode {
        match self {
            Address::Nwk(_) => AddressMode::Nwk,
            Address::Ieee(_) => AddressMode::Ieee,
            Address::Both(..) => AddressMode::NwkAndIeee,
            Address::Group(_) => AddressMode::Group,
            Address::Broadcast(_) => AddressMode::Broadcast,
        }
    }

    /// The network address, if this variant carries one.
    pub fn nwk(&self) -> Option<u16> {
        match self {
            Address::Nwk(nwk) | Address::Both(nwk, _) => Some(*nwk),
            _ => None,
        }
    }

    /// The extended address, if this variant carries one.
    pub fn ieee(&self) -> Option<Eui64> {
        match self {
            Address::Ieee(ieee) | Address::Both(_, ieee) => Some(*ieee),
            _ => None,
        }
    }

    /// Body size after the mode byte.
    pub fn body_len(&self) -> usize {
        match self {
            Address::Nwk(_) | Address::Group(_) | Address::Broadcast(_) => 2,
            Address::Ieee(_) => 8,
            Address::Both(..) => 10,
        }
    }

    /// The 16-bit value carried by short forms.
    fn short_value(&self) -> Option<u16> {
        match self {
            Address::Nwk(value) | Address::Group(value) => Some(*value),
            Address::Broadcast(broadcast) => Some(broadcast.value()),
            Address::Ieee(_) | Address::Both(..) => None,
        }
    }

    /// Mode byte plus body.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.body_len());
        self.write(&mut buf);
        buf.freeze()
    }

    /// Write mode byte and variant-sized body.
    pub fn write(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.mode().byte());
        match self {
            Address::Nwk(value) | Address::Group(value) => dst.put_u16_le(*value),
            Address::Broadcast(broadcast) => dst.put_u16_le(broadcast.value()),
            Address::Ieee(ieee) => dst.put_slice(ieee.wire_bytes()),
            Address::Both(nwk, ieee) => {
                dst.put_u16_le(*nwk);
                dst.put_slice(ieee.wire_bytes());
            }
        }
    }

    /// Parse a variant-sized body that followed `mode`.
    pub fn parse(mode: u8, src: &mut impl Buf) -> Result<Self, AddressError> {
        let mode = AddressMode::from_byte(mode).ok_or(AddressError::BadMode(mode))?;
        match mode {
            AddressMode::Nwk => Ok(Address::Nwk(take_u16(src)?)),
            AddressMode::Group => Ok(Address::Group(take_u16(src)?)),
            AddressMode::Broadcast => broadcast(take_u16(src)?),
            AddressMode::Ieee => Ok(Address::Ieee(take_eui64(src)?)),
            AddressMode::NwkAndIeee => {
                ensure(src, 10)?;
                let nwk = src.get_u16_le();
                Ok(Address::Both(nwk, take_eui64(src)?))
            }
            AddressMode::NotPresent => Err(AddressError::BadMode(mode.byte())),
        }
    }

    /// Write mode byte plus a two-byte slot.
    pub fn write_short(&self, dst: &mut impl BufMut) -> Result<(), AddressError> {
        let value = self
            .short_value()
            .ok_or(AddressError::NotRepresentable(self.mode()))?;
        dst.put_u8(self.mode().byte());
        dst.put_u16_le(value);
        Ok(())
    }

    /// Read mode byte plus a two-byte slot.
    pub fn read_short(src: &mut impl Buf) -> Result<Self, AddressError> {
        ensure(src, 3)?;
        let mode = src.get_u8();
        let value = src.get_u16_le();
        short_form(mode, value)
    }

    /// Write mode byte plus an eight-byte slot; short forms fill the low two
    /// bytes and zero the rest.
    pub fn write_wide(&self, dst: &mut impl BufMut) -> Result<(), AddressError> {
        match self {
            Address::Ieee(ieee) => {
                dst.put_u8(AddressMode::Ieee.byte());
                dst.put_slice(ieee.wire_bytes());
            }
            Address::Both(..) => return Err(AddressError::NotRepresentable(self.mode())),
            short => {
                let value = short
                    .short_value()
                    .ok_or(AddressError::NotRepresentable(short.mode()))?;
                dst.put_u8(short.mode().byte());
                dst.put_u16_le(value);
                dst.put_bytes(0, 6);
            }
        }
        Ok(())
    }

    /// Read mode byte plus an eight-byte slot.
    pub fn read_wide(src: &mut impl Buf) -> Result<Self, AddressError> {
        ensure(src, 9)?;
        let mode = src.get_u8();
        let mut slot = [0u8; 8];
        src.copy_to_slice(&mut slot);
        if mode == AddressMode::Ieee.byte() {
            return Ok(Address::Ieee(Eui64(slot)));
        }
        short_form(mode, u16::from_le_bytes([slot[0], slot[1]]))
    }
}

fn short_form(mode: u8, value: u16) -> Result<Address, AddressError> {
    match AddressMode::from_byte(mode) {
        Some(AddressMode::Nwk) => Ok(Address::Nwk(value)),
        Some(AddressMode::Group) => Ok(Address::Group(value)),
        Some(AddressMode::Broadcast) => broadcast(value),
        _ => Err(AddressError::BadMode(mode)),
    }
}

fn broadcast(value: u16) -> Result<Address, AddressError> {
    BroadcastAddress::from_u16(value)
        .map(Address::Broadcast)
        .ok_or(AddressError::BadBroadcast(value))
}

fn ensure(src: &impl Buf, needed: usize) -> Result<(), AddressError> {
    if src.remaining() < needed {
        return Err(AddressError::Truncated {
            needed,
            available: src.remaining(),
        });
    }
    Ok(())
}

fn take_u16(src: &mut impl Buf) -> Result<u16, AddressError> {
    ensure(src, 2)?;
    Ok(src.get_u16_le())
}

fn take_eui64(src: &mut impl Buf) -> Result<Eui64, AddressError> {
    ensure(src, 8)?;
    let mut bytes = [0u8; 8];
    src.copy_to_slice(&mut bytes);
    Ok(Eui64(bytes))
}

impl From<BroadcastAddress> for Address {
    fn from(value: BroadcastAddress) -> Self {
        Address::Broadcast(value)
    }
}

impl From<Eui64> for Address {
    fn from(value: Eui64) -> Self {
        Address::Ieee(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Nwk(nwk) => write!(f, "0x{nwk:04x}"),
            Address::Ieee(ieee) => write!(f, "{ieee}"),
            Address::Both(nwk, ieee) => write!(f, "0x{nwk:04x}/{ieee}"),
            Address::Group(group) => write!(f, "group:0x{group:04x}"),
            Address::Broadcast(broadcast) => write!(f, "broadcast:0x{:04x}", broadcast.value()),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Parses the [`Display`](fmt::Display) forms back. Also accepts
    /// `nwk:`/`ieee:` prefixes, decimal short addresses and broadcast names
    /// such as `broadcast:all-routers-and-coordinator`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let invalid = |reason| AddressError::Parse {
            input: input.to_string(),
            reason,
        };

        if let Some(rest) = input.strip_prefix("group:") {
            return parse_u16(rest)
                .map(Address::Group)
                .ok_or_else(|| invalid("group id must be a 16-bit number"));
        }
        if let Some(rest) = input.strip_prefix("broadcast:") {
            if let Some(named) = BroadcastAddress::from_name(rest) {
                return Ok(Address::Broadcast(named));
            }
            let value = parse_u16(rest).ok_or_else(|| invalid("unknown broadcast address"))?;
            return broadcast(value);
        }
        if let Some(rest) = input.strip_prefix("ieee:") {
            return rest.parse().map(Address::Ieee);
        }
        if let Some(rest) = input.strip_prefix("nwk:") {
            return parse_u16(rest)
                .map(Address::Nwk)
                .ok_or_else(|| invalid("network address must be a 16-bit number"));
        }
        if let Some((nwk, ieee)) = input.split_once('/') {
            let nwk = parse_u16(nwk).ok_or_else(|| invalid("network address must be a 16-bit number"))?;
            return Ok(Address::Both(nwk, ieee.parse()?));
        }
        if input.contains(':') || input.len() == 18 {
            return input.parse().map(Address::Ieee);
        }
        parse_u16(input)
            .map(Address::Nwk)
            .ok_or_else(|| invalid("expected a network address, extended address, group or broadcast"))
    }
}

/// Parse `0x`-prefixed hex or decimal.
pub(crate) fn parse_u16(text: &str) -> Option<u16> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
