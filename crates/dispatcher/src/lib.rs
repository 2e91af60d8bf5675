//! # Dispatcher
//!
//! Inbound log routing and sink fan-out.
//!
//! Responsibilities:
//! - Classify decoded logs and turn them into `RelayEvent`s
//! - Maintain the per-category last-known-state cache
//! - Handle operator control commands (cache updates, snapshots, uplink)
//! - Fan events out to isolated sink workers so a slow sink never blocks
//!   routing

pub mod cache;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod router;
pub mod sensor;
pub mod sinks;

pub use cache::CategoryCache;
pub use contracts::{DataSink, RelayEvent};
pub use control::{ControlAction, ControlCommand, ControlOutcome};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use router::{LogRouter, RouterSnapshot, RouterStats};
pub use sensor::{sensor_record, SensorRecordError};
pub use sinks::{ChannelSink, FileSink, LogSink, NetworkSink};
