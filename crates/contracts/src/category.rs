//! Log categories
//!
//! `LogCategory` drives inbound routing; `CacheCategory` names the
//! last-known-state slots written by operator commands.

use serde::{Deserialize, Serialize};

use crate::Topic;

/// Routing category of an inbound log, derived from its header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Heartbeats, stage changes, operator responses, mode changes
    General,
    /// Nested numeric sensor readings
    Sensor,
    /// Valve states
    Valve,
    /// No known category matched; persisted only
    Unclassified,
}

const GENERAL_MARKERS: [&str; 4] = ["heartbeat", "stage", "response", "mode"];

impl LogCategory {
    /// Classify a header by substring membership
    ///
    /// Precedence when a header matches several markers:
    /// sensor, then valve, then general. A log lands in exactly one
    /// category, so a header such as `sensor_data_mode` is routed as sensor
    /// data only and never also as a general log.
    pub fn classify(header: &str) -> Self {
        if header.contains("sensor_data") {
            Self::Sensor
        } else if header.contains("valve_data") {
            Self::Valve
        } else if GENERAL_MARKERS.iter().any(|m| header.contains(m)) {
            Self::General
        } else {
            Self::Unclassified
        }
    }

    /// Broadcast topic for this category
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Self::General => Some(Topic::General),
            Self::Sensor => Some(Topic::SensorData),
            Self::Valve => Some(Topic::ValveData),
            Self::Unclassified => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Sensor => "sensor",
            Self::Valve => "valve",
            Self::Unclassified => "unclassified",
        }
    }
}

/// Last-known-state cache slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    General,
    Sensors,
    Valves,
    Buttons,
}

impl CacheCategory {
    /// All slots, in snapshot emission order
    pub const ALL: [CacheCategory; 4] = [
        CacheCategory::General,
        CacheCategory::Sensors,
        CacheCategory::Valves,
        CacheCategory::Buttons,
    ];

    /// Parse an `update_<category>` control header
    pub fn from_update_header(header: &str) -> Option<Self> {
        match header {
            "update_general" => Some(Self::General),
            "update_sensors" => Some(Self::Sensors),
            "update_valves" => Some(Self::Valves),
            "update_buttons" => Some(Self::Buttons),
            _ => None,
        }
    }

    /// Topic on which this slot is emitted during a snapshot
    pub fn snapshot_topic(&self) -> Topic {
        match self {
            Self::General => Topic::GeneralCopy,
            Self::Sensors => Topic::SensorsCopy,
            Self::Valves => Topic::ValvesCopy,
            Self::Buttons => Topic::ButtonsCopy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Sensors => "sensors",
            Self::Valves => "valves",
            Self::Buttons => "buttons",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_general_markers() {
        for header in ["heartbeat", "stage", "response", "mode", "flight_mode"] {
            assert_eq!(LogCategory::classify(header), LogCategory::General, "{header}");
        }
    }

    #[test]
    fn classify_data_headers() {
        assert_eq!(LogCategory::classify("sensor_data"), LogCategory::Sensor);
        assert_eq!(LogCategory::classify("valve_data"), LogCategory::Valve);
        assert_eq!(LogCategory::classify("sensor_data_mode"), LogCategory::Sensor);
    }

    #[test]
    fn classify_miss() {
        assert_eq!(LogCategory::classify("telemetry"), LogCategory::Unclassified);
        assert_eq!(LogCategory::Unclassified.topic(), None);
    }

    #[test]
    fn update_headers() {
        assert_eq!(
            CacheCategory::from_update_header("update_valves"),
            Some(CacheCategory::Valves)
        );
        assert_eq!(CacheCategory::from_update_header("update_stage"), None);
        assert_eq!(CacheCategory::Buttons.snapshot_topic(), Topic::ButtonsCopy);
    }
}
