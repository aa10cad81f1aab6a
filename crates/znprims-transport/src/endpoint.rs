use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Where the serial bridge is listening.
///
/// Accepted spellings:
/// - `unix:/run/znp.sock` or a bare path
/// - `tcp://192.168.1.20:6638` or `tcp:host:port`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Endpoint {
    /// Short transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Unix(_) => "unix-domain-socket",
            Endpoint::Tcp(_) => "tcp",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TransportError::InvalidEndpoint {
                input: input.to_string(),
                reason: "endpoint must not be empty",
            });
        }

        if let Some(rest) = trimmed
            .strip_prefix("tcp://")
            .or_else(|| trimmed.strip_prefix("tcp:"))
        {
            return parse_tcp(input, rest);
        }

        let path = trimmed.strip_prefix("unix:").unwrap_or(trimmed);
        if path.is_empty() {
            return Err(TransportError::InvalidEndpoint {
                input: input.to_string(),
                reason: "unix endpoint needs a socket path",
            });
        }
        Ok(Endpoint::Unix(PathBuf::from(path)))
    }
}

fn parse_tcp(input: &str, rest: &str) -> Result<Endpoint, TransportError> {
    let invalid = |reason| TransportError::InvalidEndpoint {
        input: input.to_string(),
        reason,
    };

    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| invalid("tcp endpoint needs host:port"))?;
    if host.is_empty() {
        return Err(invalid("tcp endpoint needs a host"));
    }
    port.parse::<u16>()
        .map_err(|_| invalid("tcp port must be a number in 0-65535"))?;
    Ok(Endpoint::Tcp(rest.to_string()))
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}
