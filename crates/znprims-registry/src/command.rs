use std::fmt;

use bytes::{Bytes, BytesMut};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use znprims_frame::{CommandType, Frame, Subsystem};

use crate::definition::{CommandIdentity, Layout};
use crate::field::{encoded_len, Shown};
use crate::value::{FieldMap, Value};

/// One request, response or indication, fully decoded.
///
/// Immutable: [`with_sequence`](Command::with_sequence) returns a new command
/// rather than patching this one.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    layout: Layout,
    fields: FieldMap,
    sequence: Option<u8>,
    payload: Bytes,
}

impl Command {
    pub(crate) fn new(layout: Layout, fields: FieldMap, payload: Bytes, sequence: Option<u8>) -> Self {
        Self {
            layout,
            fields,
            sequence,
            payload,
        }
    }

    pub fn identity(&self) -> CommandIdentity {
        self.layout.identity
    }

    pub fn kind(&self) -> CommandType {
        self.layout.identity.kind
    }

    pub fn subsystem(&self) -> Subsystem {
        self.layout.identity.subsystem
    }

    pub fn id(&self) -> u8 {
        self.layout.identity.id
    }

    pub fn name(&self) -> &'static str {
        self.layout.name
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Transaction sequence number: assigned on outbound commands, read from
    /// the sequence field on inbound ones.
    pub fn sequence(&self) -> Option<u8> {
        self.sequence
    }

    /// Encoded payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The `status` field, when the command has one.
    pub fn status(&self) -> Option<u8> {
        match self.fields.get("status") {
            Some(Value::U8(status)) => Some(*status),
            _ => None,
        }
    }

    /// Copy of this command tagged with `tsn`, written into the sequence field
    /// when the layout has one.
    pub fn with_sequence(&self, tsn: u8) -> Command {
        let mut next = self.clone();
        next.sequence = Some(tsn);

        let Some(field) = self.layout.sequence_field else {
            return next;
        };
        if let Some(offset) = self.offset_of(field) {
            let mut payload = BytesMut::from(self.payload.as_ref());
            if let Some(slot) = payload.get_mut(offset) {
                *slot = tsn;
                next.payload = payload.freeze();
                next.fields.insert(field, Value::U8(tsn));
            }
        }
        next
    }

    fn offset_of(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for def in self.layout.fields {
            if def.name == name {
                return Some(offset);
            }
            offset += encoded_len(def.kind, self.fields.get(def.name)?);
        }
        None
    }

    pub fn to_frame(&self) -> Frame {
        Frame::new(
            self.kind(),
            self.subsystem(),
            self.id(),
            self.payload.clone(),
        )
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Fields in declaration order.
    pub fn ordered_fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.layout
            .fields
            .iter()
            .filter_map(|def| self.fields.get(def.name).map(|value| (def.name, value)))
    }

    /// Fields in declaration order, formatted as in [`Display`](fmt::Display).
    pub fn described_fields(&self) -> impl Iterator<Item = (&'static str, String)> + '_ {
        self.layout.fields.iter().filter_map(|def| {
            self.fields
                .get(def.name)
                .map(|value| (def.name, Shown(def.kind, value).to_string()))
        })
    }
}

impl fmt::Display for Command {
    /// `SREQ ZDO nodeDescReq tsn: 1 {dstaddr: 0xd04a, nwkaddrofinterest: 0x2ea2}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind(), self.subsystem(), self.name())?;
        if let Some(tsn) = self.sequence {
            write!(f, " tsn: {tsn}")?;
        }
        f.write_str(" {")?;
        let mut first = true;
        for def in self.layout.fields {
            let Some(value) = self.fields.get(def.name) else {
                continue;
            };
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}: {}", def.name, Shown(def.kind, value))?;
        }
        f.write_str("}")
    }
}

struct OrderedFields<'a>(&'a Command);

impl Serialize for OrderedFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.0.ordered_fields() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind().name())?;
        map.serialize_entry("subsystem", self.subsystem().name())?;
        map.serialize_entry("command", self.name())?;
        map.serialize_entry("id", &self.id())?;
        if let Some(tsn) = self.sequence {
            map.serialize_entry("tsn", &tsn)?;
        }
        map.serialize_entry("fields", &OrderedFields(self))?;
        map.end()
    }
}
