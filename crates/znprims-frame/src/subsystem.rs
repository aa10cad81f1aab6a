//! Header enums packed into the first command byte.
//!
//! `cmd0 = (type << 5) | subsystem`: three bits of command type, five bits of
//! subsystem. Values the firmware may add later decode as `Unknown`.

use std::fmt;
use std::str::FromStr;

/// Command type (the "direction tag" of a command identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandType {
    Poll,
    /// Synchronous request; the radio answers with an `Srsp` of the same id.
    Sreq,
    /// Asynchronous request or indication.
    Areq,
    /// Synchronous response.
    Srsp,
    Unknown(u8),
}

impl CommandType {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => CommandType::Poll,
            1 => CommandType::Sreq,
            2 => CommandType::Areq,
            3 => CommandType::Srsp,
            other => CommandType::Unknown(other),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            CommandType::Poll => 0,
            CommandType::Sreq => 1,
            CommandType::Areq => 2,
            CommandType::Srsp => 3,
            CommandType::Unknown(other) => other & 0x07,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandType::Poll => "POLL",
            CommandType::Sreq => "SREQ",
            CommandType::Areq => "AREQ",
            CommandType::Srsp => "SRSP",
            CommandType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::Unknown(bits) => write!(f, "TYPE{bits}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POLL" => Ok(CommandType::Poll),
            "SREQ" => Ok(CommandType::Sreq),
            "AREQ" => Ok(CommandType::Areq),
            "SRSP" => Ok(CommandType::Srsp),
            _ => Err(format!("unknown command type: {s}")),
        }
    }
}

/// Coarse command namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    /// Sent by the radio when it cannot parse a request.
    RpcError,
    Sys,
    Mac,
    Nwk,
    Af,
    Zdo,
    Sapi,
    Util,
    Debug,
    App,
    AppConfig,
    GreenPower,
    Unknown(u8),
}

const KNOWN: [Subsystem; 12] = [
    Subsystem::RpcError,
    Subsystem::Sys,
    Subsystem::Mac,
    Subsystem::Nwk,
    Subsystem::Af,
    Subsystem::Zdo,
    Subsystem::Sapi,
    Subsystem::Util,
    Subsystem::Debug,
    Subsystem::App,
    Subsystem::AppConfig,
    Subsystem::GreenPower,
];

impl Subsystem {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x1F {
            0 => Subsystem::RpcError,
            1 => Subsystem::Sys,
            2 => Subsystem::Mac,
            3 => Subsystem::Nwk,
            4 => Subsystem::Af,
            5 => Subsystem::Zdo,
            6 => Subsystem::Sapi,
            7 => Subsystem::Util,
            8 => Subsystem::Debug,
            9 => Subsystem::App,
            15 => Subsystem::AppConfig,
            21 => Subsystem::GreenPower,
            other => Subsystem::Unknown(other),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Subsystem::RpcError => 0,
            Subsystem::Sys => 1,
            Subsystem::Mac => 2,
            Subsystem::Nwk => 3,
            Subsystem::Af => 4,
            Subsystem::Zdo => 5,
            Subsystem::Sapi => 6,
            Subsystem::Util => 7,
            Subsystem::Debug => 8,
            Subsystem::App => 9,
            Subsystem::AppConfig => 15,
            Subsystem::GreenPower => 21,
            Subsystem::Unknown(other) => other & 0x1F,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Subsystem::RpcError => "RPC_ERROR",
            Subsystem::Sys => "SYS",
            Subsystem::Mac => "MAC",
            Subsystem::Nwk => "NWK",
            Subsystem::Af => "AF",
            Subsystem::Zdo => "ZDO",
            Subsystem::Sapi => "SAPI",
            Subsystem::Util => "UTIL",
            Subsystem::Debug => "DEBUG",
            Subsystem::App => "APP",
            Subsystem::AppConfig => "APP_CNF",
            Subsystem::GreenPower => "GREENPOWER",
            Subsystem::Unknown(_) => "UNKNOWN",
        }
    }

    /// All named subsystems, in id order.
    pub fn known() -> &'static [Subsystem] {
        &KNOWN
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Unknown(bits) => write!(f, "SUBSYSTEM{bits}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Subsystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        KNOWN
            .iter()
            .copied()
            .find(|subsystem| subsystem.name() == upper)
            .ok_or_else(|| format!("unknown subsystem: {s}"))
    }
}

/// Pack the first header byte.
pub fn cmd0(kind: CommandType, subsystem: Subsystem) -> u8 {
    (kind.bits() << 5) | subsystem.bits()
}

/// Split the first header byte.
pub fn split_cmd0(cmd0: u8) -> (CommandType, Subsystem) {
    (CommandType::from_bits(cmd0 >> 5), Subsystem::from_bits(cmd0))
}
