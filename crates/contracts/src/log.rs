//! Log / Packet - the unit of telemetry carried over the link
//!
//! A `Packet` batches one or more `Log`s under a single priority.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ContractError, LogCategory};

/// Dispatch priority
///
/// Ordered by urgency: `Critical` is serviced before `Warning`, which is
/// serviced before `Info`. Heartbeats travel at `Info`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    Warning,
    #[default]
    Info,
}

impl Priority {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Log payload
///
/// Either free text (heartbeats, stage names, operator responses) or a
/// structured map (sensor and valve readings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogMessage {
    Text(String),
    Fields(Map<String, Value>),
}

impl LogMessage {
    /// Structured fields, if this is a map payload
    pub fn as_fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Fields(fields) => Some(fields),
            Self::Text(_) => None,
        }
    }

    /// Convert a JSON value into a message
    ///
    /// Only strings and objects are payloads; anything else is `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::Fields(fields)),
            Value::String(text) => Some(Self::Text(text)),
            _ => None,
        }
    }

    /// JSON view of the payload
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Fields(fields) => Value::Object(fields.clone()),
        }
    }
}

impl From<String> for LogMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for LogMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Map<String, Value>> for LogMessage {
    fn from(fields: Map<String, Value>) -> Self {
        Self::Fields(fields)
    }
}

/// A single application-level log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Category tag (e.g. "heartbeat", "sensor_data")
    pub header: String,

    /// Payload
    pub message: LogMessage,

    /// Seconds since session start
    pub timestamp: f64,
}

impl Log {
    /// Create a new log entry
    pub fn new(header: impl Into<String>, message: impl Into<LogMessage>, timestamp: f64) -> Self {
        Self {
            header: header.into(),
            message: message.into(),
            timestamp,
        }
    }

    /// Routing category derived from the header
    pub fn category(&self) -> LogCategory {
        LogCategory::classify(&self.header)
    }

    /// JSON view `{header, message, timestamp}` used for broadcast payloads
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "header": self.header,
            "message": self.message.to_value(),
            "timestamp": self.timestamp,
        })
    }
}

/// A prioritized batch of logs
///
/// Always holds at least one log; both the constructor and deserialization
/// enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PacketRepr")]
pub struct Packet {
    logs: Vec<Log>,
    priority: Priority,
    timestamp: f64,
}

#[derive(Deserialize)]
struct PacketRepr {
    logs: Vec<Log>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    timestamp: f64,
}

impl TryFrom<PacketRepr> for Packet {
    type Error = ContractError;

    fn try_from(repr: PacketRepr) -> Result<Self, Self::Error> {
        Packet::new(repr.logs, repr.priority, repr.timestamp)
    }
}

impl Packet {
    /// Create a packet from a non-empty list of logs
    ///
    /// # Errors
    /// `ContractError::EmptyPacket` when `logs` is empty
    pub fn new(logs: Vec<Log>, priority: Priority, timestamp: f64) -> Result<Self, ContractError> {
        if logs.is_empty() {
            return Err(ContractError::EmptyPacket);
        }
        Ok(Self {
            logs,
            priority,
            timestamp,
        })
    }

    /// Wrap a single log, stamping the packet with the log's timestamp
    pub fn single(log: Log, priority: Priority) -> Self {
        let timestamp = log.timestamp;
        Self {
            logs: vec![log],
            priority,
            timestamp,
        }
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn into_logs(self) -> Vec<Log> {
        self.logs
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }
}
