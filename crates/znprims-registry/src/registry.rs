use std::collections::HashMap;

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;
use znprims_frame::{CommandType, Frame, Subsystem};

use crate::catalog;
use crate::command::Command;
use crate::config::RegistryConfig;
use crate::definition::{CommandDefinition, CommandIdentity, Layout};
use crate::error::{DecodeError, EncodeError, RegistryError, Result};
use crate::field::{decode_field, encode_field, FieldDef, FieldKind};
use crate::value::{FieldMap, Value};

/// Identity-keyed table of validated command layouts.
pub struct CommandRegistry {
    layouts: HashMap<CommandIdentity, Layout>,
    names: HashMap<(CommandType, Subsystem), HashMap<&'static str, CommandIdentity>>,
    definitions: Vec<CommandDefinition>,
    config: RegistryConfig,
}

impl CommandRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            layouts: HashMap::new(),
            names: HashMap::new(),
            definitions: Vec::new(),
            config,
        }
    }

    /// Registry preloaded with the built-in catalog.
    pub fn builtin() -> Result<Self> {
        Self::builtin_with_config(RegistryConfig::default())
    }

    pub fn builtin_with_config(config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        for table in catalog::tables() {
            registry.register_all(table)?;
        }
        Ok(registry)
    }

    /// Validate and add one definition.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<()> {
        validate(&definition, &self.config)?;

        if self
            .definitions
            .iter()
            .any(|known| known.subsystem == definition.subsystem && known.name == definition.name)
        {
            return Err(RegistryError::DuplicateName {
                subsystem: definition.subsystem,
                name: definition.name,
            });
        }

        let layouts = definition.layouts();
        if let Some(taken) = layouts
            .iter()
            .find(|layout| self.layouts.contains_key(&layout.identity))
        {
            return Err(RegistryError::DuplicateIdentity(taken.identity));
        }

        for layout in layouts {
            let identity = layout.identity;
            self.names
                .entry((identity.kind, identity.subsystem))
                .or_default()
                .insert(layout.name, identity);
            self.layouts.insert(identity, layout);
        }
        trace!(
            subsystem = %definition.subsystem,
            name = definition.name,
            id = definition.id,
            "registered command definition"
        );
        self.definitions.push(definition);
        Ok(())
    }

    pub fn register_all(&mut self, definitions: &[CommandDefinition]) -> Result<()> {
        for definition in definitions {
            self.register(*definition)?;
        }
        Ok(())
    }

    /// Field layout for a wire identity.
    pub fn lookup(&self, identity: CommandIdentity) -> Option<&Layout> {
        self.layouts.get(&identity)
    }

    /// Field layout by type, subsystem and command name.
    pub fn lookup_name(&self, kind: CommandType, subsystem: Subsystem, name: &str) -> Option<&Layout> {
        let identity = self.names.get(&(kind, subsystem))?.get(name)?;
        self.layouts.get(identity)
    }

    /// Encode a field map into the payload for `identity`.
    pub fn encode(&self, identity: CommandIdentity, fields: &FieldMap) -> Result<Bytes, EncodeError> {
        let layout = self
            .lookup(identity)
            .ok_or(EncodeError::UnknownCommand(identity))?;
        self.encode_layout(layout, fields).map(|(payload, _)| payload)
    }

    /// Decode a payload for `identity`; the whole payload must be consumed.
    pub fn decode(&self, identity: CommandIdentity, payload: &[u8]) -> Result<FieldMap, DecodeError> {
        let layout = self
            .lookup(identity)
            .ok_or(DecodeError::UnknownCommand(identity))?;
        decode_layout(layout, Bytes::copy_from_slice(payload))
    }

    /// Build an outbound command by name.
    ///
    /// Omitted length fields and sequence fields are filled in; the returned
    /// command's field map is complete.
    pub fn build(
        &self,
        kind: CommandType,
        subsystem: Subsystem,
        name: &str,
        fields: FieldMap,
    ) -> Result<Command> {
        let layout = self
            .lookup_name(kind, subsystem, name)
            .ok_or_else(|| RegistryError::NotFound {
                kind,
                subsystem,
                name: name.to_string(),
            })?;
        let (payload, complete) = self.encode_layout(layout, &fields)?;
        Ok(Command::new(*layout, complete, payload, None))
    }

    /// Build an outbound command from a JSON object of field values.
    pub fn build_json(
        &self,
        kind: CommandType,
        subsystem: Subsystem,
        name: &str,
        json: &serde_json::Value,
    ) -> Result<Command> {
        let object = json.as_object().ok_or(RegistryError::NotAnObject)?;
        let layout = self
            .lookup_name(kind, subsystem, name)
            .ok_or_else(|| RegistryError::NotFound {
                kind,
                subsystem,
                name: name.to_string(),
            })?;

        let mut fields = FieldMap::new();
        for (field_name, raw) in object {
            let def = layout
                .field(field_name)
                .ok_or_else(|| EncodeError::UnknownField {
                    command: layout.name,
                    field: field_name.clone(),
                })?;
            let value = Value::from_json(def.kind, raw).map_err(|reason| RegistryError::InvalidValue {
                field: field_name.clone(),
                reason,
            })?;
            fields.insert(field_name.clone(), value);
        }
        self.build(kind, subsystem, name, fields)
    }

    /// Decode a frame into a command.
    pub fn parse(&self, frame: &Frame) -> Result<Command, DecodeError> {
        let identity = CommandIdentity::new(frame.kind, frame.subsystem, frame.command);
        let layout = self
            .lookup(identity)
            .ok_or(DecodeError::UnknownCommand(identity))?;
        let fields = decode_layout(layout, frame.payload.clone())?;
        let sequence = layout
            .sequence_field
            .and_then(|field| fields.get(field))
            .and_then(Value::as_u64)
            .map(|tsn| tsn as u8);
        Ok(Command::new(*layout, fields, frame.payload.clone(), sequence))
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[CommandDefinition] {
        &self.definitions
    }

    /// Every layout, sorted by identity.
    pub fn layouts(&self) -> Vec<&Layout> {
        let mut layouts: Vec<&Layout> = self.layouts.values().collect();
        layouts.sort_by_key(|layout| layout.identity);
        layouts
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn encode_layout(&self, layout: &Layout, fields: &FieldMap) -> Result<(Bytes, FieldMap), EncodeError> {
        if let Some((unknown, _)) = fields.iter().find(|(name, _)| layout.field(name).is_none()) {
            return Err(EncodeError::UnknownField {
                command: layout.name,
                field: unknown.to_string(),
            });
        }

        let mut payload = BytesMut::with_capacity(layout.min_payload_size());
        let mut complete = FieldMap::new();
        for def in layout.fields {
            let measured = measured_length(layout, def, fields)?;
            let value = match (fields.get(def.name), measured) {
                (Some(value), Some(actual)) => {
                    if let Some(declared) = value.as_u64() {
                        if declared != actual as u64 {
                            return Err(EncodeError::LengthMismatch {
                                field: def.name,
                                declared,
                                actual,
                            });
                        }
                    }
                    value.clone()
                }
                (Some(value), None) => value.clone(),
                (None, Some(actual)) if self.config.autofill_lengths => sized_integer(def, actual as u64)?,
                (None, _) if layout.sequence_field == Some(def.name) => Value::U8(0),
                (None, _) => {
                    return Err(EncodeError::MissingField {
                        command: layout.name,
                        field: def.name,
                    })
                }
            };

            encode_field(def, &value, &mut payload)?;
            let value = match value.as_u64() {
                Some(raw) if def.kind.integer_max().is_some() => sized_integer(def, raw)?,
                _ => value,
            };
            complete.insert(def.name, value);
        }

        if payload.len() > self.config.max_payload_size {
            return Err(EncodeError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }
        Ok((payload.freeze(), complete))
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// When `def` is a length field, the measured size of the field it describes.
fn measured_length(
    layout: &Layout,
    def: &FieldDef,
    fields: &FieldMap,
) -> Result<Option<usize>, EncodeError> {
    let Some(target) = layout
        .fields
        .iter()
        .find(|candidate| candidate.length_ref == Some(def.name))
    else {
        return Ok(None);
    };

    let value = fields.get(target.name).ok_or(EncodeError::MissingField {
        command: layout.name,
        field: target.name,
    })?;
    value
        .measured_len()
        .map(Some)
        .ok_or(EncodeError::WrongType {
            field: target.name,
            expected: target.kind.name(),
            found: value.type_name(),
        })
}

fn sized_integer(def: &FieldDef, raw: u64) -> Result<Value, EncodeError> {
    let max = def.kind.integer_max().unwrap_or(0);
    if raw > max {
        return Err(EncodeError::OutOfRange {
            field: def.name,
            value: raw,
            max,
        });
    }
    Ok(match def.kind {
        FieldKind::U8 => Value::U8(raw as u8),
        FieldKind::U32 => Value::U32(raw as u32),
        _ => Value::U16(raw as u16),
    })
}

fn decode_layout(layout: &Layout, payload: Bytes) -> Result<FieldMap, DecodeError> {
    let mut src = payload;
    let mut fields = FieldMap::new();
    for def in layout.fields {
        let count = def
            .length_ref
            .and_then(|reference| fields.get(reference))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let value = decode_field(layout.name, def, &mut src, count)?;
        fields.insert(def.name, value);
    }

    if src.has_remaining() {
        return Err(DecodeError::TrailingBytes {
            command: layout.name,
            extra: src.remaining(),
        });
    }
    Ok(fields)
}

fn validate(definition: &CommandDefinition, config: &RegistryConfig) -> Result<()> {
    let invalid = |reason: String| RegistryError::InvalidDefinition {
        command: definition.name,
        reason,
    };

    let layouts = definition.layouts();
    for layout in &layouts {
        for (index, field) in layout.fields.iter().enumerate() {
            let earlier = &layout.fields[..index];
            if earlier.iter().any(|other| other.name == field.name) {
                return Err(invalid(format!("field {} declared twice", field.name)));
            }

            match (field.kind.is_measured(), field.length_ref) {
                (true, None) => {
                    return Err(invalid(format!(
                        "{} field {} needs a length reference",
                        field.kind, field.name
                    )))
                }
                (false, Some(_)) => {
                    return Err(invalid(format!(
                        "{} field {} cannot take a length reference",
                        field.kind, field.name
                    )))
                }
                (true, Some(reference)) => match earlier.iter().find(|other| other.name == reference) {
                    Some(target) if target.kind.is_integer() => {}
                    Some(_) => {
                        return Err(invalid(format!(
                            "length reference {reference} of {} is not an integer field",
                            field.name
                        )))
                    }
                    None => {
                        return Err(invalid(format!(
                            "length reference {reference} of {} does not name an earlier field",
                            field.name
                        )))
                    }
                },
                (false, None) => {}
            }
        }

        let min = layout.min_payload_size();
        if min > config.max_payload_size {
            return Err(invalid(format!(
                "{} payload needs at least {min} bytes, max is {}",
                layout.identity.kind, config.max_payload_size
            )));
        }

        if let Some(sequence) = layout.sequence_field {
            if layout.field(sequence).map(|field| field.kind) != Some(FieldKind::U8) {
                return Err(invalid(format!("sequence field {sequence} must be u8")));
            }
        }
    }

    if let Some(sequence) = definition.sequence {
        if layouts.iter().all(|layout| layout.sequence_field.is_none()) {
            return Err(invalid(format!("sequence field {sequence} is not declared")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use znprims_frame::{decode_frame, MAX_PAYLOAD};

    use super::*;
    use crate::address::{Address, BroadcastAddress, Eui64};

    fn registry() -> CommandRegistry {
        CommandRegistry::builtin().unwrap()
    }

    fn node_desc_req(registry: &CommandRegistry) -> Command {
        registry
            .build(
                CommandType::Sreq,
                Subsystem::Zdo,
                "nodeDescReq",
                FieldMap::new()
                    .with("dstaddr", 0xD04Au16)
                    .with("nwkaddrofinterest", 0x2EA2u16),
            )
            .unwrap()
    }

    fn sample(kind: FieldKind) -> Value {
        match kind {
            FieldKind::U8 => Value::U8(0x5A),
            FieldKind::U16 => Value::U16(0x1234),
            FieldKind::U32 => Value::U32(0xDEAD_BEEF),
            FieldKind::Nwk => Value::U16(0xBEEF),
            FieldKind::Ieee => Value::Ieee(Eui64::from_u64(0x0012_4B00_0102_0304)),
            FieldKind::Buffer => Value::Bytes(Bytes::from_static(&[1, 2, 3])),
            FieldKind::FixedBuffer(len) => Value::Bytes(Bytes::from(vec![0xAA; len])),
            FieldKind::ListU8 => Value::ListU8(vec![1, 8]),
            FieldKind::ListU16 => Value::ListU16(vec![0x0006, 0x0008]),
            FieldKind::Address => Value::Address(Address::Nwk(0x1234)),
            FieldKind::AddressShort => Value::Address(Address::Group(0x0002)),
            FieldKind::AddressWide => Value::Address(Address::Ieee(Eui64::from_u64(7))),
        }
    }

    #[test]
    fn builtin_catalog_loads() {
        use CommandType::{Areq, Sreq};
        use Subsystem::{Af, AppConfig, Sys, Util, Zdo};

        const CATALOG: &[(CommandType, Subsystem, &str)] = &[
            (Areq, Sys, "resetReq"),
            (Sreq, Sys, "ping"),
            (Sreq, Sys, "version"),
            (Sreq, Sys, "getExtAddr"),
            (Sreq, Sys, "osalNvRead"),
            (Sreq, Sys, "osalNvWrite"),
            (Areq, Sys, "resetInd"),
            (Sreq, Af, "register"),
            (Sreq, Af, "dataRequest"),
            (Sreq, Af, "dataRequestExt"),
            (Areq, Af, "dataConfirm"),
            (Areq, Af, "incomingMsg"),
            (Areq, Af, "incomingMsgExt"),
            (Sreq, Zdo, "nwkAddrReq"),
            (Sreq, Zdo, "ieeeAddrReq"),
            (Sreq, Zdo, "nodeDescReq"),
            (Sreq, Zdo, "simpleDescReq"),
            (Sreq, Zdo, "activeEpReq"),
            (Sreq, Zdo, "mgmtLeaveReq"),
            (Sreq, Zdo, "mgmtPermitJoinReq"),
            (Sreq, Zdo, "startupFromApp"),
            (Areq, Zdo, "nwkAddrRsp"),
            (Areq, Zdo, "ieeeAddrRsp"),
            (Areq, Zdo, "nodeDescRsp"),
            (Areq, Zdo, "simpleDescRsp"),
            (Areq, Zdo, "activeEpRsp"),
            (Areq, Zdo, "mgmtLeaveRsp"),
            (Areq, Zdo, "mgmtPermitJoinRsp"),
            (Areq, Zdo, "stateChangeInd"),
            (Areq, Zdo, "endDeviceAnnceInd"),
            (Areq, Zdo, "leaveInd"),
            (Areq, Zdo, "tcDeviceInd"),
            (Areq, Zdo, "permitJoinInd"),
            (Sreq, Util, "getDeviceInfo"),
            (Sreq, Util, "ledControl"),
            (Sreq, AppConfig, "bdbStartCommissioning"),
            (Sreq, AppConfig, "bdbSetChannel"),
            (Areq, AppConfig, "bdbComissioningNotifcation"),
        ];

        let registry = registry();
        assert_eq!(registry.len(), CATALOG.len());
        for &(kind, subsystem, name) in CATALOG {
            assert!(
                registry.lookup_name(kind, subsystem, name).is_some(),
                "{kind} {subsystem} {name} should be in the catalog"
            );
        }
        assert!(registry
            .lookup_name(CommandType::Srsp, Subsystem::Sys, "ping")
            .is_some());
        assert!(registry
            .lookup_name(CommandType::Srsp, Subsystem::Zdo, "stateChangeInd")
            .is_none());
    }

    #[test]
    fn node_desc_req_golden_frame() {
        let registry = registry();
        let frame = node_desc_req(&registry).to_frame().to_bytes().unwrap();
        assert_eq!(
            frame.as_ref(),
            &[0xFE, 0x04, 0x25, 0x02, 0x4A, 0xD0, 0xA2, 0x2E, 0x35]
        );
    }

    #[test]
    fn describes_itself_with_sequence() {
        let registry = registry();
        let command = node_desc_req(&registry).with_sequence(1);
        assert_eq!(
            command.to_string(),
            "SREQ ZDO nodeDescReq tsn: 1 {dstaddr: 0xd04a, nwkaddrofinterest: 0x2ea2}"
        );
        assert_eq!(command.payload(), node_desc_req(&registry).payload());

        let described: Vec<_> = command.described_fields().collect();
        assert_eq!(
            described,
            [
                ("dstaddr", "0xd04a".to_string()),
                ("nwkaddrofinterest", "0x2ea2".to_string())
            ]
        );
    }

    #[test]
    fn parses_ping_response() {
        let registry = registry();
        let mut wire = BytesMut::from(&[0xFE, 0x02, 0x61, 0x01, 0x59, 0x01, 0x3A][..]);
        let frame = decode_frame(&mut wire, MAX_PAYLOAD).unwrap().unwrap();

        let command = registry.parse(&frame).unwrap();
        assert_eq!(command.name(), "ping");
        assert_eq!(command.kind(), CommandType::Srsp);
        assert_eq!(command.get("capabilities"), Some(&Value::U16(0x0159)));
    }

    #[test]
    fn every_layout_roundtrips_a_sample_map() {
        let registry = registry();
        for layout in registry.layouts() {
            let fields: FieldMap = layout
                .fields
                .iter()
                .filter(|def| !layout.fields.iter().any(|other| other.length_ref == Some(def.name)))
                .map(|def| (def.name.to_string(), sample(def.kind)))
                .collect();

            let command = registry
                .build(layout.identity.kind, layout.identity.subsystem, layout.name, fields)
                .unwrap_or_else(|err| panic!("{}: {err}", layout.name));
            let decoded = registry
                .decode(layout.identity, command.payload())
                .unwrap_or_else(|err| panic!("{}: {err}", layout.name));
            assert_eq!(&decoded, command.fields(), "{}", layout.name);
        }
    }

    #[test]
    fn autofills_and_checks_lengths() {
        let registry = registry();
        let data = Bytes::from_static(&[0x01, 0x56, 0x4C]);
        let base = FieldMap::new()
            .with("dstaddr", 0xD04Au16)
            .with("destendpoint", 1u8)
            .with("srcendpoint", 1u8)
            .with("clusterid", 6u16)
            .with("options", 0u8)
            .with("radius", 30u8)
            .with("data", data);

        let command = registry
            .build(CommandType::Sreq, Subsystem::Af, "dataRequest", base.clone())
            .unwrap();
        assert_eq!(command.get("len"), Some(&Value::U8(3)));
        assert_eq!(command.get("transid"), Some(&Value::U8(0)));

        let err = registry
            .build(
                CommandType::Sreq,
                Subsystem::Af,
                "dataRequest",
                base.with("len", 5u8),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Encode(EncodeError::LengthMismatch {
                field: "len",
                declared: 5,
                actual: 3
            })
        ));
    }

    #[test]
    fn with_sequence_patches_payload() {
        let registry = registry();
        let command = registry
            .build(
                CommandType::Sreq,
                Subsystem::Af,
                "dataRequest",
                FieldMap::new()
                    .with("dstaddr", 0x0001u16)
                    .with("destendpoint", 1u8)
                    .with("srcendpoint", 1u8)
                    .with("clusterid", 6u16)
                    .with("options", 0u8)
                    .with("radius", 30u8)
                    .with("data", Bytes::from_static(&[0x10])),
            )
            .unwrap();

        let tagged = command.with_sequence(39);
        assert_eq!(tagged.sequence(), Some(39));
        assert_eq!(tagged.payload()[6], 39);
        assert_eq!(command.payload()[6], 0);

        let reparsed = registry.parse(&tagged.to_frame()).unwrap();
        assert_eq!(reparsed.get("transid"), Some(&Value::U8(39)));
        assert_eq!(reparsed.sequence(), Some(39));
    }

    #[test]
    fn rejects_unknown_and_missing_fields() {
        let registry = registry();
        let err = registry
            .build(
                CommandType::Sreq,
                Subsystem::Zdo,
                "nodeDescReq",
                FieldMap::new()
                    .with("dstaddr", 1u16)
                    .with("nwkaddrofinterest", 1u16)
                    .with("bogus", 1u8),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Encode(EncodeError::UnknownField { .. })
        ));

        let err = registry
            .build(
                CommandType::Sreq,
                Subsystem::Zdo,
                "nodeDescReq",
                FieldMap::new().with("dstaddr", 1u16),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Encode(EncodeError::MissingField {
                field: "nwkaddrofinterest",
                ..
            })
        ));
    }

    #[test]
    fn payload_size_is_bounded() {
        let registry = registry();
        let err = registry
            .build(
                CommandType::Sreq,
                Subsystem::Af,
                "dataRequest",
                FieldMap::new()
                    .with("dstaddr", 1u16)
                    .with("destendpoint", 1u8)
                    .with("srcendpoint", 1u8)
                    .with("clusterid", 6u16)
                    .with("options", 0u8)
                    .with("radius", 30u8)
                    .with("data", Bytes::from(vec![0u8; 250])),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Encode(EncodeError::PayloadTooLarge { size: 260, max: 250 })
        ));
    }

    #[test]
    fn decode_requires_exact_length() {
        let registry = registry();
        let identity = CommandIdentity::new(CommandType::Srsp, Subsystem::Sys, 0x01);

        let err = registry.decode(identity, &[0x59]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { field: "capabilities", .. }));

        let err = registry.decode(identity, &[0x59, 0x01, 0x00]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TrailingBytes {
                command: "ping",
                extra: 1
            }
        );
    }

    #[test]
    fn unknown_identity_is_decode_error() {
        let registry = registry();
        let frame = Frame::new(CommandType::Areq, Subsystem::Mac, 0x42, Bytes::new());
        assert!(matches!(
            registry.parse(&frame),
            Err(DecodeError::UnknownCommand(CommandIdentity {
                subsystem: Subsystem::Mac,
                id: 0x42,
                ..
            }))
        ));
    }

    #[test]
    fn bad_address_mode_in_extended_message() {
        let registry = registry();
        let identity = CommandIdentity::new(CommandType::Areq, Subsystem::Af, 0x82);
        let mut payload = vec![0x00, 0x00, 0x06, 0x00, 0x07];
        payload.extend_from_slice(&[0u8; 8]);
        payload.extend_from_slice(&[1, 0, 0, 1, 0, 0x50, 0, 0, 0, 0, 0, 0, 0, 0]);

        let err = registry.decode(identity, &payload).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::BadAddressMode {
                field: "srcaddr",
                mode: 0x07,
                ..
            }
        ));
    }

    #[test]
    fn permit_join_broadcast_serializes_reserved_value() {
        let registry = registry();
        let command = registry
            .build(
                CommandType::Sreq,
                Subsystem::Zdo,
                "mgmtPermitJoinReq",
                FieldMap::new()
                    .with(
                        "dstaddr",
                        Address::Broadcast(BroadcastAddress::AllRoutersAndCoordinator),
                    )
                    .with("duration", 60u8)
                    .with("tcsignificance", 0u8),
            )
            .unwrap();
        assert_eq!(command.payload().as_ref(), &[0x0F, 0xFC, 0xFF, 60, 0]);
        assert_eq!(
            command.to_string(),
            "SREQ ZDO mgmtPermitJoinReq {dstaddr: broadcast:0xfffc, duration: 60, tcsignificance: 0}"
        );
    }

    const ROUTE_PROBE: CommandDefinition = CommandDefinition::sreq(
        Subsystem::Nwk,
        "routeProbe",
        0x10,
        &[FieldDef::address("dstaddr"), FieldDef::u8("radius")],
        &[FieldDef::u8("status")],
    );

    #[test]
    fn address_field_roundtrips_nwk_and_both() {
        let mut registry = CommandRegistry::new();
        registry.register(ROUTE_PROBE).unwrap();

        let ieee: Eui64 = "00:01:02:03:04:05:06:07".parse().unwrap();
        for address in [Address::Nwk(0xD04A), Address::Both(0x0100, ieee)] {
            let command = registry
                .build(
                    CommandType::Sreq,
                    Subsystem::Nwk,
                    "routeProbe",
                    FieldMap::new().with("dstaddr", address).with("radius", 5u8),
                )
                .unwrap();
            let parsed = registry.parse(&command.to_frame()).unwrap();
            let decoded = parsed.get("dstaddr").and_then(Value::as_address).unwrap();

            assert_eq!(*decoded, address);
            assert_eq!(decoded.mode(), address.mode());
        }

        let both = registry
            .build(
                CommandType::Sreq,
                Subsystem::Nwk,
                "routeProbe",
                FieldMap::new()
                    .with("dstaddr", Address::Both(0x0100, ieee))
                    .with("radius", 5u8),
            )
            .unwrap();
        assert_eq!(both.payload().len(), 1 + 10 + 1);
    }

    #[test]
    fn build_json_converts_by_field_kind() {
        let registry = registry();
        let json = serde_json::json!({"dstaddr": "0xd04a", "nwkaddrofinterest": 11938});
        let command = registry
            .build_json(CommandType::Sreq, Subsystem::Zdo, "nodeDescReq", &json)
            .unwrap();
        assert_eq!(command.payload(), node_desc_req(&registry).payload());

        let err = registry
            .build_json(
                CommandType::Sreq,
                Subsystem::Zdo,
                "nodeDescReq",
                &serde_json::json!([1, 2]),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotAnObject));
    }

    #[test]
    fn serializes_in_declaration_order() {
        let registry = registry();
        let json = serde_json::to_string(&node_desc_req(&registry).with_sequence(1)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"SREQ","subsystem":"ZDO","command":"nodeDescReq","id":2,"tsn":1,"fields":{"dstaddr":53322,"nwkaddrofinterest":11938}}"#
        );
    }

    #[test]
    fn rejects_forward_length_reference() {
        const BAD: CommandDefinition = CommandDefinition::areq(
            Subsystem::Debug,
            "bad",
            0x80,
            &[FieldDef::buffer("data", "len"), FieldDef::u8("len")],
        );
        let err = CommandRegistry::new().register(BAD).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDefinition { command: "bad", .. }));
    }

    #[test]
    fn rejects_duplicates() {
        let mut registry = registry();
        let err = registry.register(catalog::SYS[1]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { name: "ping", .. }));

        let clash = CommandDefinition::sreq(Subsystem::Sys, "pingAgain", 0x01, &[], &[]);
        let err = registry.register(clash).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateIdentity(_)));
    }

    #[test]
    fn rejects_layout_over_payload_limit() {
        const HUGE: CommandDefinition = CommandDefinition::areq(
            Subsystem::Debug,
            "huge",
            0x81,
            &[FieldDef::fixed("blob", 300)],
        );
        let err = CommandRegistry::new().register(HUGE).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDefinition { .. }));
    }
}
