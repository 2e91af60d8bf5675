//! Relay orchestration and the end-of-run report.

mod control;
mod orchestrator;
mod stats;

pub use orchestrator::{link_label, Relay, RelayConfig};
pub use stats::RelayStats;
