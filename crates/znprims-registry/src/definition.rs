use std::fmt;

use znprims_frame::{CommandType, Subsystem};

use crate::field::FieldDef;

/// How a definition is exchanged with the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    /// Synchronous request; the radio answers with an SRSP of the same id.
    Sreq,
    /// Asynchronous request or indication; no paired response.
    Areq,
}

/// A command as it appears in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDefinition {
    pub subsystem: Subsystem,
    pub name: &'static str,
    pub id: u8,
    pub kind: DefinitionKind,
    /// Fields of the SREQ or AREQ payload.
    pub request: &'static [FieldDef],
    /// Fields of the SRSP payload; empty for AREQ definitions.
    pub response: &'static [FieldDef],
    /// A `u8` field carrying the transaction sequence number.
    pub sequence: Option<&'static str>,
}

impl CommandDefinition {
    pub const fn sreq(
        subsystem: Subsystem,
        name: &'static str,
        id: u8,
        request: &'static [FieldDef],
        response: &'static [FieldDef],
    ) -> Self {
        Self {
            subsystem,
            name,
            id,
            kind: DefinitionKind::Sreq,
            request,
            response,
            sequence: None,
        }
    }

    pub const fn areq(
        subsystem: Subsystem,
        name: &'static str,
        id: u8,
        fields: &'static [FieldDef],
    ) -> Self {
        Self {
            subsystem,
            name,
            id,
            kind: DefinitionKind::Areq,
            request: fields,
            response: &[],
            sequence: None,
        }
    }

    /// Name the field that carries the transaction sequence number.
    pub const fn with_sequence(self, field: &'static str) -> Self {
        Self {
            sequence: Some(field),
            ..self
        }
    }

    /// Every wire layout this definition describes: SREQ and SRSP for a
    /// synchronous command, a single AREQ otherwise.
    pub fn layouts(&self) -> Vec<Layout> {
        let layout = |kind, fields: &'static [FieldDef]| Layout {
            identity: CommandIdentity {
                kind,
                subsystem: self.subsystem,
                id: self.id,
            },
            name: self.name,
            fields,
            sequence_field: self
                .sequence
                .filter(|name| fields.iter().any(|field| field.name == *name)),
        };

        match self.kind {
            DefinitionKind::Sreq => vec![
                layout(CommandType::Sreq, self.request),
                layout(CommandType::Srsp, self.response),
            ],
            DefinitionKind::Areq => vec![layout(CommandType::Areq, self.request)],
        }
    }
}

/// Wire identity of a frame: type, subsystem and command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandIdentity {
    pub kind: CommandType,
    pub subsystem: Subsystem,
    pub id: u8,
}

impl CommandIdentity {
    pub fn new(kind: CommandType, subsystem: Subsystem, id: u8) -> Self {
        Self {
            kind,
            subsystem,
            id,
        }
    }
}

impl fmt::Display for CommandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} 0x{:02x}", self.kind, self.subsystem, self.id)
    }
}

/// The resolved field layout for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub identity: CommandIdentity,
    pub name: &'static str,
    pub fields: &'static [FieldDef],
    /// Field carrying the transaction sequence number in this direction.
    pub sequence_field: Option<&'static str>,
}

impl Layout {
    /// An asynchronous frame that reports the outcome of a sequenced request.
    pub fn is_confirm(&self) -> bool {
        self.identity.kind == CommandType::Areq && self.sequence_field.is_some()
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Sum of every field's smallest encoding.
    pub fn min_payload_size(&self) -> usize {
        self.fields.iter().map(|field| field.kind.min_size()).sum()
    }
}
