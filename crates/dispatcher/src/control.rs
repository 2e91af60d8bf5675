//! Operator control commands
//!
//! Named events from the UI carrying `{header, message}`. Recognized headers
//! touch the category cache; anything else becomes outbound telemetry.

use contracts::CacheCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatcherError;

const STORE_DATA: &str = "store_data";

/// Inbound control command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub header: String,
    #[serde(default)]
    pub message: Value,
}

/// What a command asks the router to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// `update_<category>`: overwrite a cache slot
    UpdateCache(CacheCategory),
    /// `store_data`: broadcast every cache slot
    Snapshot,
    /// Anything else: send to the vehicle
    Forward,
}

/// Result of handling a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    CacheUpdated(CacheCategory),
    SnapshotEmitted,
    /// Enqueued for sending with this sequence number
    Forwarded { sequence: u64 },
}

impl ControlCommand {
    pub fn new(header: impl Into<String>, message: impl Into<Value>) -> Self {
        Self {
            header: header.into(),
            message: message.into(),
        }
    }

    /// Parse one JSON command (e.g. a line read from stdin)
    pub fn parse(input: &str) -> Result<Self, DispatcherError> {
        Ok(serde_json::from_str(input.trim())?)
    }

    pub fn action(&self) -> ControlAction {
        if let Some(category) = CacheCategory::from_update_header(&self.header) {
            ControlAction::UpdateCache(category)
        } else if self.header == STORE_DATA {
            ControlAction::Snapshot
        } else {
            ControlAction::Forward
        }
    }
}
