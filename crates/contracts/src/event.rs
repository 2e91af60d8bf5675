//! RelayEvent - Router output, consumed by sinks
//!
//! The three external collaborator calls (`save`, `emit`, `put`) expressed
//! as one event type so they can be fanned out uniformly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Log;

/// Broadcast topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    General,
    SensorData,
    ValveData,
    GeneralCopy,
    SensorsCopy,
    ValvesCopy,
    ButtonsCopy,
}

impl Topic {
    /// Wire name of the topic
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::SensorData => "sensor_data",
            Self::ValveData => "valve_data",
            Self::GeneralCopy => "general_copy",
            Self::SensorsCopy => "sensors_copy",
            Self::ValvesCopy => "valves_copy",
            Self::ButtonsCopy => "buttons_copy",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// sensor type -> location -> value key -> reading
pub type SensorReadings = BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>;

/// Flattened, all-numeric sensor record for timestamp-keyed storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Log timestamp (storage key)
    pub timestamp: f64,

    /// Timestamp reported by the vehicle inside the payload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<f64>,

    /// Numeric readings
    pub readings: SensorReadings,
}

/// Event emitted by the router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Durable persistence of a decoded log
    Save { log: Log },

    /// Real-time broadcast to UI observers
    Emit { topic: Topic, payload: Value },

    /// Structured sensor storage keyed by timestamp
    Put { record: SensorRecord },
}

impl RelayEvent {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Save { .. } => "save",
            Self::Emit { .. } => "emit",
            Self::Put { .. } => "put",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names() {
        assert_eq!(Topic::SensorData.as_str(), "sensor_data");
        assert_eq!(Topic::GeneralCopy.to_string(), "general_copy");
    }

    #[test]
    fn event_is_tagged() {
        let event = RelayEvent::Emit {
            topic: Topic::ValveData,
            payload: Value::Null,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "emit");
        assert_eq!(json["topic"], "valve_data");
        assert_eq!(event.kind(), "emit");
    }
}
