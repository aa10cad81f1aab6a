//! Outward requests expressed by destination address.
//!
//! Each helper picks the command that fits the address mode, the reply that
//! confirms it, and reports a `(status, message)` pair where 0 is success.

use bytes::Bytes;
use tracing::debug;
use znprims_registry::{
    status_message, Address, BroadcastAddress, Command, CommandType, FieldMap, Subsystem,
};

use crate::engine::{reply, Engine};
use crate::error::{EngineError, Result};
use crate::matcher::Match;
use crate::waiter::{Outcome, STATUS_FAILURE};

/// Status code and message; 0 means success.
pub type Status = (u8, String);

/// Hop limit used unless the caller sets one.
pub const DEFAULT_RADIUS: u8 = 30;

/// Endpoint that reaches every endpoint in a group.
pub const GROUP_ENDPOINT: u8 = 0xFF;

/// An application payload for one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub destination: Address,
    pub dst_endpoint: u8,
    pub src_endpoint: u8,
    pub cluster: u16,
    pub options: u8,
    pub radius: u8,
    pub data: Bytes,
}

impl DataRequest {
    pub fn new(
        destination: Address,
        dst_endpoint: u8,
        src_endpoint: u8,
        cluster: u16,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            destination,
            dst_endpoint,
            src_endpoint,
            cluster,
            options: 0,
            radius: DEFAULT_RADIUS,
            data: data.into(),
        }
    }

    /// Addressed to every member of `group`.
    pub fn group(group: u16, src_endpoint: u8, cluster: u16, data: impl Into<Bytes>) -> Self {
        Self::new(Address::Group(group), GROUP_ENDPOINT, src_endpoint, cluster, data)
    }

    pub fn broadcast(
        address: BroadcastAddress,
        dst_endpoint: u8,
        src_endpoint: u8,
        cluster: u16,
        data: impl Into<Bytes>,
    ) -> Self {
        Self::new(
            Address::Broadcast(address),
            dst_endpoint,
            src_endpoint,
            cluster,
            data,
        )
    }

    pub fn with_radius(mut self, radius: u8) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_options(mut self, options: u8) -> Self {
        self.options = options;
        self
    }

    fn common_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("destendpoint", self.dst_endpoint)
            .with("srcendpoint", self.src_endpoint)
            .with("clusterid", self.cluster)
            .with("options", self.options)
            .with("radius", self.radius)
            .with("data", self.data.clone())
    }

    /// AF dataRequest for a short address, dataRequestExt for anything else.
    fn to_command(&self, engine: &Engine) -> Result<Command> {
        let (name, fields) = match self.destination {
            Address::Nwk(nwk) | Address::Both(nwk, _) => {
                ("dataRequest", self.common_fields().with("dstaddr", nwk))
            }
            other => (
                "dataRequestExt",
                self.common_fields()
                    .with("dstaddr", other)
                    .with("dstpanid", 0u16),
            ),
        };
        Ok(engine
            .registry()
            .build(CommandType::Sreq, Subsystem::Af, name, fields)?)
    }
}

fn data_confirm() -> Match {
    Match::areq(Subsystem::Af, "dataConfirm").with_sequence("transid")
}

fn delivery_status(outcome: Outcome) -> Status {
    match &outcome {
        Outcome::Resolved(reply) => match reply.status() {
            None | Some(0) => (0, "message send success".to_string()),
            Some(code) => (code, format!("message send failure: {}", status_message(code))),
        },
        _ => outcome.status(),
    }
}

/// Send to whatever `request.destination` names.
pub async fn send_data(engine: &Engine, request: DataRequest) -> Result<Status> {
    match request.destination {
        Address::Group(_) => multicast(engine, request).await,
        Address::Broadcast(_) => broadcast(engine, request).await,
        _ => unicast(engine, request).await,
    }
}

/// Send to one device and wait for the radio's transmit confirm.
pub async fn unicast(engine: &Engine, request: DataRequest) -> Result<Status> {
    if matches!(request.destination, Address::Group(_) | Address::Broadcast(_)) {
        return Err(EngineError::InvalidRequest(format!(
            "unicast needs a device address, got {}",
            request.destination
        )));
    }
    let command = request.to_command(engine)?;
    let outcome = engine
        .request(command, data_confirm(), engine.config().reply_timeout)
        .await?;
    Ok(delivery_status(outcome))
}

/// Send to a group and wait for the radio's transmit confirm.
pub async fn multicast(engine: &Engine, request: DataRequest) -> Result<Status> {
    let Address::Group(group) = request.destination else {
        return Err(EngineError::InvalidRequest(format!(
            "multicast needs a group address, got {}",
            request.destination
        )));
    };
    debug!(group, cluster = request.cluster, "multicast");
    let command = request.to_command(engine)?;
    let outcome = engine
        .request(command, data_confirm(), engine.config().reply_timeout)
        .await?;
    Ok(delivery_status(outcome))
}

/// Broadcast; nothing is waited for beyond queueing the frame.
pub async fn broadcast(engine: &Engine, request: DataRequest) -> Result<Status> {
    if !matches!(request.destination, Address::Broadcast(_)) {
        return Err(EngineError::InvalidRequest(format!(
            "broadcast needs a broadcast address, got {}",
            request.destination
        )));
    }
    let command = request.to_command(engine)?;
    engine.post(command).await?;
    Ok(broadcast_sent())
}

fn broadcast_sent() -> Status {
    (0, "broadcast send success".to_string())
}

/// Ask `target` for its node descriptor.
pub async fn node_descriptor(engine: &Engine, target: u16, nwk_of_interest: u16) -> Result<Command> {
    let fields = FieldMap::new()
        .with("dstaddr", target)
        .with("nwkaddrofinterest", nwk_of_interest);
    let command = engine
        .registry()
        .build(CommandType::Sreq, Subsystem::Zdo, "nodeDescReq", fields)?;
    let predicate = Match::areq(Subsystem::Zdo, "nodeDescRsp").with_field("srcaddr", target);

    let timeout = engine.config().reply_timeout;
    let reply = reply(engine.request(command, predicate, timeout).await?, timeout)?;
    if reply.kind() == CommandType::Srsp {
        let code = reply.status().unwrap_or(STATUS_FAILURE);
        return Err(EngineError::Rejected {
            code,
            message: status_message(code),
        });
    }
    Ok(reply)
}

/// Open the network for joining for `duration` seconds (0 closes it).
///
/// A broadcast address is sent as its reserved value and nothing is waited
/// for; a short address waits for that device's response.
pub async fn permit_join(engine: &Engine, address: Address, duration: u8) -> Result<Status> {
    let fields = FieldMap::new()
        .with("dstaddr", address)
        .with("duration", duration)
        .with("tcsignificance", 0u8);
    let command = engine
        .registry()
        .build(CommandType::Sreq, Subsystem::Zdo, "mgmtPermitJoinReq", fields)?;

    match address {
        Address::Broadcast(_) => {
            engine.post(command).await?;
            Ok(broadcast_sent())
        }
        Address::Nwk(nwk) => {
            let predicate =
                Match::areq(Subsystem::Zdo, "mgmtPermitJoinRsp").with_field("srcaddr", nwk);
            let outcome = engine
                .request(command, predicate, engine.config().reply_timeout)
                .await?;
            Ok(outcome.status())
        }
        other => Err(EngineError::InvalidRequest(format!(
            "permit join needs a short or broadcast address, got {other}"
        ))),
    }
}
