//! Sink implementations
//!
//! Every sink receives every event and ignores the kinds it does not store.

mod channel;
mod file;
mod log;
mod network;

pub use self::channel::ChannelSink;
pub use self::file::{FileSink, FileSinkConfig, BLACK_BOX_FILE, SENSOR_FILE};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};
