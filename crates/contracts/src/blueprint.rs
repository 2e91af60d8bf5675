//! RelayBlueprint - Config Loader output
//!
//! Describes the complete relay configuration: transport selection, session
//! timing, and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::ContractError;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Physical link
    pub transport: TransportConfig,

    /// Loop timing and buffer limits
    #[serde(default)]
    pub session: SessionConfig,

    /// Output routing configuration
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Transport selection
///
/// `use_serial` picks the variant; only the selected sub-table is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportConfig {
    /// true = serial radio, false = TCP socket
    #[serde(default)]
    pub use_serial: bool,

    #[serde(default)]
    pub serial: Option<SerialConfig>,

    #[serde(default)]
    pub socket: Option<SocketConfig>,
}

/// Borrowed view of the selected transport settings
#[derive(Debug, Clone, Copy)]
pub enum TransportSelection<'a> {
    Serial(&'a SerialConfig),
    Socket(&'a SocketConfig),
}

impl TransportConfig {
    /// Resolve the selected variant
    ///
    /// # Errors
    /// Validation error when the selected sub-table is missing
    pub fn selection(&self) -> Result<TransportSelection<'_>, ContractError> {
        if self.use_serial {
            self.serial
                .as_ref()
                .map(TransportSelection::Serial)
                .ok_or_else(|| {
                    ContractError::config_validation(
                        "transport.serial",
                        "use_serial = true requires a [transport.serial] table",
                    )
                })
        } else {
            self.socket
                .as_ref()
                .map(TransportSelection::Socket)
                .ok_or_else(|| {
                    ContractError::config_validation(
                        "transport.socket",
                        "use_serial = false requires a [transport.socket] table",
                    )
                })
        }
    }
}

/// Serial radio settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path (e.g. "/dev/ttyUSB0")
    pub device: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Driver read timeout; a read with no data returns empty after this
    #[serde(default = "default_serial_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Maximum bytes per radio write
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause between consecutive chunks
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
}

impl SerialConfig {
    /// Settings for `device` with default radio parameters
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_serial_read_timeout_ms(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

fn default_baud_rate() -> u32 {
    57600
}

fn default_serial_read_timeout_ms() -> u64 {
    5
}

fn default_chunk_size() -> usize {
    60
}

fn default_chunk_delay_ms() -> u64 {
    200
}

/// TCP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Receive buffer size per read
    #[serde(default = "default_recv_buffer")]
    pub recv_buffer: usize,

    /// A read with no data returns empty after this
    #[serde(default = "default_socket_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl SocketConfig {
    /// "host:port" bind address
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            recv_buffer: default_recv_buffer(),
            read_timeout_ms: default_socket_read_timeout_ms(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5005
}

fn default_recv_buffer() -> usize {
    8192
}

fn default_socket_read_timeout_ms() -> u64 {
    50
}

/// Session loop timing and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sender poll interval (one packet per tick)
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Listener back-off when a read returns no data
    #[serde(default = "default_listen_interval_ms")]
    pub listen_interval_ms: u64,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Ingest loop bounded wait
    #[serde(default = "default_ingest_timeout_ms")]
    pub ingest_timeout_ms: u64,

    /// Master switch for outbound traffic
    #[serde(default = "default_send_enabled")]
    pub send_enabled: bool,

    #[serde(default = "default_ingest_queue_capacity")]
    pub ingest_queue_capacity: usize,

    /// Reassembly accumulator limit before resync
    #[serde(default = "default_max_reassembly_bytes")]
    pub max_reassembly_bytes: usize,
}

impl SessionConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn listen_interval(&self) -> Duration {
        Duration::from_millis(self.listen_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn ingest_timeout(&self) -> Duration {
        Duration::from_millis(self.ingest_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval_ms(),
            listen_interval_ms: default_listen_interval_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            ingest_timeout_ms: default_ingest_timeout_ms(),
            send_enabled: default_send_enabled(),
            ingest_queue_capacity: default_ingest_queue_capacity(),
            max_reassembly_bytes: default_max_reassembly_bytes(),
        }
    }
}

fn default_send_interval_ms() -> u64 {
    200
}

fn default_listen_interval_ms() -> u64 {
    5
}

fn default_heartbeat_interval_ms() -> u64 {
    3000
}

fn default_ingest_timeout_ms() -> u64 {
    1000
}

fn default_send_enabled() -> bool {
    true
}

fn default_ingest_queue_capacity() -> usize {
    1024
}

fn default_max_reassembly_bytes() -> usize {
    64 * 1024
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Worker queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// tracing output
    Log,
    /// JSON-lines files
    File,
    /// UDP broadcast
    Network,
}

impl RelayBlueprint {
    /// Blueprint for a socket relay with default timings and no sinks
    pub fn socket(bind_addr: impl Into<String>, port: u16) -> Self {
        Self {
            version: ConfigVersion::V1,
            transport: TransportConfig {
                use_serial: false,
                serial: None,
                socket: Some(SocketConfig {
                    bind_addr: bind_addr.into(),
                    port,
                    ..SocketConfig::default()
                }),
            },
            session: SessionConfig::default(),
            sinks: Vec::new(),
        }
    }
}
