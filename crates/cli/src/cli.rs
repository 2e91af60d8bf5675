//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Relay - bidirectional bridge between a remote device and the
/// ground station
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-relay",
    author,
    version,
    about = "Bidirectional telemetry relay over a serial radio or TCP link",
    long_about = "Relays framed telemetry between a remote device and local consumers.\n\n\
                  Reassembles inbound frames, classifies and routes decoded logs to the \n\
                  configured sinks, and sends prioritized outbound packets and heartbeats \n\
                  over the same link."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay until interrupted or the link fails
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "TELEMETRY_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Use the serial radio regardless of the configuration
    #[arg(long, conflicts_with = "socket", env = "TELEMETRY_RELAY_SERIAL")]
    pub serial: bool,

    /// Use the TCP socket regardless of the configuration
    #[arg(long, env = "TELEMETRY_RELAY_SOCKET")]
    pub socket: bool,

    /// Override the serial device path
    #[arg(long, env = "TELEMETRY_RELAY_DEVICE")]
    pub device: Option<String>,

    /// Override the serial baud rate
    #[arg(long, env = "TELEMETRY_RELAY_BAUD")]
    pub baud: Option<u32>,

    /// Override the socket bind address
    #[arg(long, env = "TELEMETRY_RELAY_BIND")]
    pub bind: Option<String>,

    /// Override the socket port
    #[arg(long, env = "TELEMETRY_RELAY_PORT")]
    pub port: Option<u16>,

    /// Read operator commands as newline-delimited JSON from stdin
    #[arg(long, env = "TELEMETRY_RELAY_CONTROL_STDIN")]
    pub control_stdin: bool,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "TELEMETRY_RELAY_DURATION")]
    pub duration: u64,

    /// Validate configuration and exit without opening the link
    #[arg(long)]
    pub dry_run: bool,

    /// Capacity of the router-to-dispatcher event channel
    #[arg(long, default_value = "256", env = "TELEMETRY_RELAY_EVENT_BUFFER")]
    pub event_buffer: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TELEMETRY_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show session timing and limits
    #[arg(long)]
    pub session: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
