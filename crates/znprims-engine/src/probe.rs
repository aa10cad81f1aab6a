use std::time::Duration;

use serde::Serialize;
use tracing::info;
use znprims_registry::{Command, CommandType, FieldMap, Subsystem};

use crate::engine::{reply, Engine};
use crate::error::{EngineError, Result};
use crate::matcher::Match;

/// Subsystems a radio reports in its ping capabilities.
const CAPABILITIES: &[(u16, &str)] = &[
    (0x0001, "SYS"),
    (0x0002, "MAC"),
    (0x0004, "NWK"),
    (0x0008, "AF"),
    (0x0010, "ZDO"),
    (0x0020, "SAPI"),
    (0x0040, "UTIL"),
    (0x0080, "DEBUG"),
    (0x0100, "APP"),
    (0x1000, "ZOAD"),
];

/// What a radio says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioInfo {
    /// Bitmask of subsystems the firmware serves.
    pub capabilities: u16,
    pub transport_revision: u8,
    pub product: u8,
    pub major: u8,
    pub minor: u8,
    pub maintenance: u8,
    /// Firmware build revision.
    pub revision: u32,
}

impl RadioInfo {
    /// `major.minor.maintenance`
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.maintenance)
    }

    pub fn capability_names(&self) -> Vec<&'static str> {
        CAPABILITIES
            .iter()
            .filter(|(bit, _)| self.capabilities & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

/// Ping the radio, then ask for its firmware version.
pub async fn probe(engine: &Engine, timeout: Duration) -> Result<RadioInfo> {
    let ping = ask(engine, "ping", timeout).await?;
    let version = ask(engine, "version", timeout).await?;

    let info = RadioInfo {
        capabilities: field(&ping, "capabilities")? as u16,
        transport_revision: field(&version, "transportrev")? as u8,
        product: field(&version, "product")? as u8,
        major: field(&version, "majorrel")? as u8,
        minor: field(&version, "minorrel")? as u8,
        maintenance: field(&version, "maintrel")? as u8,
        revision: field(&version, "revision")? as u32,
    };
    info!(
        version = %info.version_string(),
        revision = info.revision,
        capabilities = ?info.capability_names(),
        "radio answered probe"
    );
    Ok(info)
}

async fn ask(engine: &Engine, name: &str, timeout: Duration) -> Result<Command> {
    let command = engine
        .registry()
        .build(CommandType::Sreq, Subsystem::Sys, name, FieldMap::new())?;
    let predicate = Match::reply_to(&command);
    let outcome = engine.request(command, predicate, timeout).await?;
    reply(outcome, timeout)
}

fn field(reply: &Command, name: &str) -> Result<u64> {
    reply
        .get(name)
        .and_then(|value| value.as_u64())
        .ok_or_else(|| EngineError::NoReply(format!("{} reply has no {name}", reply.name())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;
    use znprims_frame::UnpiCodec;
    use znprims_registry::{CommandRegistry, Frame};

    use super::*;
    use crate::config::EngineConfig;
    use crate::connection::spawn;

    #[test]
    fn capability_names_follow_bits() {
        let info = RadioInfo {
            capabilities: 0x0159,
            transport_revision: 2,
            product: 1,
            major: 2,
            minor: 7,
            maintenance: 1,
            revision: 20_210_708,
        };
        assert_eq!(info.version_string(), "2.7.1");
        assert_eq!(info.capability_names(), vec!["SYS", "AF", "ZDO", "UTIL", "APP"]);
    }

    #[tokio::test]
    async fn probe_reads_ping_and_version() {
        let (host, radio) = tokio::io::duplex(1024);
        let registry = Arc::new(CommandRegistry::builtin().unwrap());
        let (engine, outbound) = Engine::new(registry, EngineConfig::default()).unwrap();
        let connection = spawn(engine, outbound, host);

        let radio_task = tokio::spawn(async move {
            let mut radio = Framed::new(radio, UnpiCodec::new());
            while let Some(Ok(frame)) = radio.next().await {
                let payload = match frame.command {
                    0x01 => vec![0x59, 0x01],
                    0x02 => vec![0x02, 0x01, 0x02, 0x07, 0x01, 0x34, 0x12, 0x00, 0x00],
                    _ => continue,
                };
                let reply = Frame::new(CommandType::Srsp, Subsystem::Sys, frame.command, payload);
                if radio.send(reply).await.is_err() {
                    break;
                }
            }
        });

        let info = probe(connection.engine(), Duration::from_secs(2))
            .await
            .expect("probe should succeed");
        assert_eq!(info.capabilities, 0x0159);
        assert_eq!(info.version_string(), "2.7.1");
        assert_eq!(info.revision, 0x1234);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["major"], 2);

        connection.close().await;
        radio_task.await.expect("radio task should complete");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_radio_times_out() {
        let (host, _radio) = tokio::io::duplex(1024);
        let registry = Arc::new(CommandRegistry::builtin().unwrap());
        let (engine, outbound) = Engine::new(registry, EngineConfig::default()).unwrap();
        let connection = spawn(engine, outbound, host);

        let err = probe(connection.engine(), Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
        connection.close().await;
    }
}
