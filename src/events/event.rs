//! Parsed controller events.
//!
//! The input is the line format printed by `jstest --event`:
//!
//! ```text
//! Event: type 129, time 5081440, number 0, value 0
//! ```
//!
//! A line is first split into a [`RawRecord`] (`<word>: <name> <value>, ...`) and
//! then promoted to a typed [`Event`] when the required `type`, `number`, `time`
//! and `value` fields are present. Anything else is *not an event* and is left to
//! the timeline's unknown-line channel.

use crate::events::error::FieldError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Bit set in the `type` field for events of the device's startup burst.
pub const INIT_BIT: i64 = 0x80;

/// Category of the records `jstest --event` prints for device input.
pub const EVENT_CATEGORY: &str = "Event";

static RECORD_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+):(.*)$").expect("record head pattern is valid")
});

static FIELD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r", *").expect("field separator pattern is valid"));

/// Category of a controller channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Button,
    Axis,
}

impl EventKind {
    /// Numeric code used on the wire (init bit cleared).
    pub const fn code(self) -> i64 {
        match self {
            EventKind::Button => 1,
            EventKind::Axis => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(EventKind::Button),
            2 => Some(EventKind::Axis),
            _ => None,
        }
    }
}

/// A `(category, index)` pair identifying one button or axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub kind: EventKind,
    pub number: u32,
}

impl Channel {
    pub const fn new(kind: EventKind, number: u32) -> Self {
        Self { kind, number }
    }

    pub const fn button(number: u32) -> Self {
        Self::new(EventKind::Button, number)
    }

    pub const fn axis(number: u32) -> Self {
        Self::new(EventKind::Axis, number)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.kind.code(), self.number)
    }
}

/// Untyped `<word>: <name> <value>, ...` record with by-name field access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub category: String,
    fields: Vec<(String, String)>,
}

impl RawRecord {
    /// Splits a line into category and fields, or `None` if it has no `<word>:` head.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = RECORD_HEAD.captures(line)?;
        let category = caps[1].to_string();
        let fields = FIELD_SEPARATOR
            .split(caps[2].trim())
            .filter_map(|part| {
                let (name, value) = part.split_once(' ')?;
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();
        Some(Self { category, fields })
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Integer value of a named field.
    pub fn field(&self, name: &str) -> Result<i64, FieldError> {
        let raw = self
            .field_str(name)
            .ok_or_else(|| FieldError::NotFound(name.to_string()))?;
        raw.parse().map_err(|_| FieldError::NotInteger {
            name: name.to_string(),
            value: raw.to_string(),
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// One button or axis change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub category: String,
    pub kind: EventKind,
    pub init: bool,
    pub channel: u32,
    pub timestamp_ms: i64,
    pub value: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("unknown event type {0}")]
    UnknownType(i64),

    #[error("channel number out of range: {0}")]
    ChannelRange(i64),
}

impl Event {
    /// Promotes a record to a typed event.
    pub fn from_record(record: &RawRecord, text: &str) -> Result<Self, EventError> {
        let ty = record.field("type")?;
        let kind = EventKind::from_code(ty & !INIT_BIT).ok_or(EventError::UnknownType(ty))?;
        let number = record.field("number")?;
        let channel = u32::try_from(number).map_err(|_| EventError::ChannelRange(number))?;
        Ok(Self {
            category: record.category.clone(),
            kind,
            init: ty & INIT_BIT != 0,
            channel,
            timestamp_ms: record.field("time")?,
            value: record.field("value")?,
            text: text.to_string(),
        })
    }

    /// Builds an event directly, rendering its text in the wire format.
    pub fn new(kind: EventKind, init: bool, channel: u32, timestamp_ms: i64, value: i64) -> Self {
        let mut event = Self {
            category: EVENT_CATEGORY.to_string(),
            kind,
            init,
            channel,
            timestamp_ms,
            value,
            text: String::new(),
        };
        event.text = event.to_line();
        event
    }

    /// Raw bit-flagged `type` field.
    pub fn type_field(&self) -> i64 {
        if self.init {
            self.kind.code() | INIT_BIT
        } else {
            self.kind.code()
        }
    }

    pub fn key(&self) -> Channel {
        Channel::new(self.kind, self.channel)
    }

    /// Renders the structured fields back into the wire format.
    pub fn to_line(&self) -> String {
        format!(
            "{}: type {}, time {}, number {}, value {}",
            self.category,
            self.type_field(),
            self.timestamp_ms,
            self.channel,
            self.value
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Parses one line. `None` means the line is not an event.
pub fn parse(line: &str) -> Option<Event> {
    let record = RawRecord::parse(line)?;
    match Event::from_record(&record, line) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::trace!("Line {:?} is not an event: {}", line, e);
            None
        }
    }
}
