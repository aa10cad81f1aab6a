use std::fmt;

use znprims_registry::{Command, CommandType, Subsystem, Value};

/// Describes the reply a waiter is waiting for.
///
/// A reply matches when its type, subsystem and command name agree and every
/// listed field is present with an equal value. Integer widths are ignored
/// when comparing, so `Value::U8(1)` matches a `U16` field holding 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    kind: CommandType,
    subsystem: Subsystem,
    name: String,
    fields: Vec<(String, Value)>,
    sequence_field: Option<String>,
}

impl Match {
    pub fn new(kind: CommandType, subsystem: Subsystem, name: impl Into<String>) -> Self {
        Self {
            kind,
            subsystem,
            name: name.into(),
            fields: Vec::new(),
            sequence_field: None,
        }
    }

    pub fn areq(subsystem: Subsystem, name: impl Into<String>) -> Self {
        Self::new(CommandType::Areq, subsystem, name)
    }

    pub fn srsp(subsystem: Subsystem, name: impl Into<String>) -> Self {
        Self::new(CommandType::Srsp, subsystem, name)
    }

    /// The synchronous response to `request`.
    pub fn reply_to(request: &Command) -> Self {
        Self::srsp(request.subsystem(), request.name())
    }

    /// Require `name` to equal `value`.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Require `field` to carry the sequence number the engine assigns when
    /// the request is sent.
    pub fn with_sequence(mut self, field: impl Into<String>) -> Self {
        self.sequence_field = Some(field.into());
        self
    }

    /// Turn a pending sequence requirement into a concrete field check.
    pub(crate) fn bind_sequence(mut self, tsn: u8) -> Self {
        if let Some(field) = self.sequence_field.take() {
            self.fields.push((field, Value::U8(tsn)));
        }
        self
    }

    pub fn kind(&self) -> CommandType {
        self.kind
    }

    pub fn subsystem(&self) -> Subsystem {
        self.subsystem
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether only the identity is checked.
    pub fn is_identity_only(&self) -> bool {
        self.fields.is_empty() && self.sequence_field.is_none()
    }

    pub fn matches_identity(&self, kind: CommandType, subsystem: Subsystem, name: &str) -> bool {
        self.kind == kind && self.subsystem == subsystem && self.name == name
    }

    pub fn matches(&self, command: &Command) -> bool {
        self.matches_identity(command.kind(), command.subsystem(), command.name())
            && self.fields.iter().all(|(name, expected)| {
                command
                    .get(name)
                    .is_some_and(|actual| actual.loosely_eq(expected))
            })
    }
}

impl fmt::Display for Match {
    /// `AREQ ZDO nodeDescRsp where srcaddr = 53322`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.subsystem, self.name)?;
        let mut separator = " where ";
        for (name, value) in &self.fields {
            write!(f, "{separator}{name} = {value}")?;
            separator = ", ";
        }
        if let Some(field) = &self.sequence_field {
            write!(f, "{separator}{field} = <tsn>")?;
        }
        Ok(())
    }
}
