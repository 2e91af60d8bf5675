//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, TransportSelection};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    link: LinkInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LinkInfo {
    Serial {
        device: String,
        baud_rate: u32,
        chunk_size: usize,
        chunk_delay_ms: u64,
    },
    Socket {
        endpoint: String,
        recv_buffer: usize,
    },
}

#[derive(Serialize)]
struct SessionInfo {
    send_interval_ms: u64,
    listen_interval_ms: u64,
    heartbeat_interval_ms: u64,
    ingest_timeout_ms: u64,
    send_enabled: bool,
    ingest_queue_capacity: usize,
    max_reassembly_bytes: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args)?;
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) -> Result<ConfigInfo> {
    let link = match blueprint.transport.selection()? {
        TransportSelection::Serial(serial) => LinkInfo::Serial {
            device: serial.device.clone(),
            baud_rate: serial.baud_rate,
            chunk_size: serial.chunk_size,
            chunk_delay_ms: serial.chunk_delay_ms,
        },
        TransportSelection::Socket(socket) => LinkInfo::Socket {
            endpoint: socket.endpoint(),
            recv_buffer: socket.recv_buffer,
        },
    };

    let session = args.session.then(|| {
        let s = &blueprint.session;
        SessionInfo {
            send_interval_ms: s.send_interval_ms,
            listen_interval_ms: s.listen_interval_ms,
            heartbeat_interval_ms: s.heartbeat_interval_ms,
            ingest_timeout_ms: s.ingest_timeout_ms,
            send_enabled: s.send_enabled,
            ingest_queue_capacity: s.ingest_queue_capacity,
            max_reassembly_bytes: s.max_reassembly_bytes,
        }
    });

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(ConfigInfo {
        version: format!("{:?}", blueprint.version),
        link,
        session,
        sinks,
    })
}

fn print_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Telemetry Relay Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Link");
    println!("   ├─ Version: {:?}", blueprint.version);
    match blueprint.transport.selection() {
        Ok(TransportSelection::Serial(serial)) => {
            println!("   ├─ Serial: {}", serial.device);
            println!("   ├─ Baud rate: {}", serial.baud_rate);
            println!(
                "   └─ Chunking: {} bytes every {} ms",
                serial.chunk_size, serial.chunk_delay_ms
            );
        }
        Ok(TransportSelection::Socket(socket)) => {
            println!("   ├─ TCP: {}", socket.endpoint());
            println!("   └─ Receive buffer: {} bytes", socket.recv_buffer);
        }
        Err(e) => println!("   └─ Invalid: {e}"),
    }

    if args.session {
        let s = &blueprint.session;
        println!("\n⚙️  Session");
        println!("   ├─ Send interval: {} ms", s.send_interval_ms);
        println!("   ├─ Listen interval: {} ms", s.listen_interval_ms);
        println!("   ├─ Heartbeat interval: {} ms", s.heartbeat_interval_ms);
        println!("   ├─ Ingest timeout: {} ms", s.ingest_timeout_ms);
        println!("   ├─ Ingest queue: {}", s.ingest_queue_capacity);
        println!("   ├─ Reassembly limit: {} bytes", s.max_reassembly_bytes);
        println!("   └─ Sending: {}", if s.send_enabled { "on" } else { "off" });
    }

    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {})",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
