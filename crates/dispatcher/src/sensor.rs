//! Sensor log flattening
//!
//! Sensor payloads arrive as
//! `{ <sensor_type>: { <location>: { <value_key>: number } }, "timestamp"?: number }`.
//! Structured storage wants every leaf numeric, so the payload is checked
//! and flattened into a `SensorRecord` keyed by the log timestamp.

use std::collections::BTreeMap;

use contracts::{Log, SensorReadings, SensorRecord};
use serde_json::Value;
use thiserror::Error;

const REPORTED_AT_KEY: &str = "timestamp";

/// Why a sensor log could not become a structured record
#[derive(Debug, Error, PartialEq)]
pub enum SensorRecordError {
    #[error("sensor payload is text, expected a map")]
    NotStructured,

    #[error("sensor group '{sensor}' is not a map")]
    Group { sensor: String },

    #[error("location '{sensor}.{location}' is not a map")]
    Location { sensor: String, location: String },

    #[error("reading '{sensor}.{location}.{key}' is not numeric")]
    Reading {
        sensor: String,
        location: String,
        key: String,
    },

    #[error("reported timestamp is not numeric")]
    ReportedAt,
}

/// Flatten a sensor log into a numeric record
pub fn sensor_record(log: &Log) -> Result<SensorRecord, SensorRecordError> {
    let fields = log
        .message
        .as_fields()
        .ok_or(SensorRecordError::NotStructured)?;

    let mut readings = SensorReadings::new();
    let mut reported_at = None;

    for (sensor, locations) in fields {
        if sensor == REPORTED_AT_KEY {
            reported_at = Some(numeric(locations).ok_or(SensorRecordError::ReportedAt)?);
            continue;
        }

        let locations = locations
            .as_object()
            .ok_or_else(|| SensorRecordError::Group {
                sensor: sensor.clone(),
            })?;

        let mut by_location = BTreeMap::new();
        for (location, values) in locations {
            let values = values
                .as_object()
                .ok_or_else(|| SensorRecordError::Location {
                    sensor: sensor.clone(),
                    location: location.clone(),
                })?;

            let mut by_key = BTreeMap::new();
            for (key, value) in values {
                let reading = numeric(value).ok_or_else(|| SensorRecordError::Reading {
                    sensor: sensor.clone(),
                    location: location.clone(),
                    key: key.clone(),
                })?;
                by_key.insert(key.clone(), reading);
            }
            by_location.insert(location.clone(), by_key);
        }
        readings.insert(sensor.clone(), by_location);
    }

    Ok(SensorRecord {
        timestamp: log.timestamp,
        reported_at,
        readings,
    })
}

/// Numbers, or strings holding a number
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
