//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, SerialConfig, SocketConfig, TransportSelection};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::relay::{link_label, Relay, RelayConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args)?;

    info!(
        link = %link_label(&blueprint.transport),
        sinks = blueprint.sinks.len(),
        send_enabled = blueprint.session.send_enabled,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let relay = Relay::new(RelayConfig {
        blueprint,
        duration: (args.duration != 0).then(|| Duration::from_secs(args.duration)),
        control_stdin: args.control_stdin,
        event_buffer: args.event_buffer,
    });

    let stats = relay.run().await.context("Relay execution failed")?;
    stats.print_summary();

    if let Some(reason) = stats.failure() {
        return Err(CliError::session_failed(reason).into());
    }

    info!("Telemetry Relay finished");
    Ok(())
}

/// Apply transport flags on top of the loaded configuration, then re-validate
fn apply_overrides(blueprint: &mut RelayBlueprint, args: &RunArgs) -> Result<(), CliError> {
    let transport = &mut blueprint.transport;

    if args.serial {
        transport.use_serial = true;
    } else if args.socket {
        transport.use_serial = false;
    }

    if let Some(ref device) = args.device {
        info!(device = %device, "Overriding serial device from CLI");
        match transport.serial {
            Some(ref mut serial) => serial.device = device.clone(),
            None => transport.serial = Some(SerialConfig::new(device.clone())),
        }
    }
    if let Some(baud) = args.baud {
        match transport.serial {
            Some(ref mut serial) => serial.baud_rate = baud,
            None => {
                return Err(CliError::config_validation(
                    "--baud needs a serial device (set --device or [transport.serial])",
                ))
            }
        }
    }

    if args.bind.is_some() || args.port.is_some() {
        let socket = transport.socket.get_or_insert_with(SocketConfig::default);
        if let Some(ref bind) = args.bind {
            info!(bind = %bind, "Overriding socket bind address from CLI");
            socket.bind_addr = bind.clone();
        }
        if let Some(port) = args.port {
            info!(port, "Overriding socket port from CLI");
            socket.port = port;
        }
    }

    config_loader::ConfigLoader::validate(blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RelayBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Link:");
    match blueprint.transport.selection() {
        Ok(TransportSelection::Serial(serial)) => {
            println!("  Serial: {} @ {} baud", serial.device, serial.baud_rate);
            println!(
                "  Chunking: {} bytes, {} ms apart",
                serial.chunk_size, serial.chunk_delay_ms
            );
        }
        Ok(TransportSelection::Socket(socket)) => {
            println!("  TCP: {}", socket.endpoint());
        }
        Err(e) => println!("  invalid: {e}"),
    }

    let session = &blueprint.session;
    println!("\nSession:");
    println!("  Send interval: {} ms", session.send_interval_ms);
    println!("  Heartbeat interval: {} ms", session.heartbeat_interval_ms);
    println!("  Sending: {}", if session.send_enabled { "on" } else { "off" });

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["telemetry-relay", "run"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn socket_overrides_apply() {
        let mut blueprint = RelayBlueprint::socket("0.0.0.0", 5005);
        apply_overrides(
            &mut blueprint,
            &run_args(&["--bind", "127.0.0.1", "--port", "6000"]),
        )
        .unwrap();

        let socket = blueprint.transport.socket.unwrap();
        assert_eq!(socket.endpoint(), "127.0.0.1:6000");
        assert!(!blueprint.transport.use_serial);
    }

    #[test]
    fn serial_flag_with_device_creates_serial_table() {
        let mut blueprint = RelayBlueprint::socket("0.0.0.0", 5005);
        apply_overrides(
            &mut blueprint,
            &run_args(&["--serial", "--device", "/dev/ttyACM0", "--baud", "9600"]),
        )
        .unwrap();

        assert!(blueprint.transport.use_serial);
        let serial = blueprint.transport.serial.unwrap();
        assert_eq!(serial.device, "/dev/ttyACM0");
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.chunk_size, 60);
    }

    #[test]
    fn serial_flag_without_device_is_rejected() {
        let mut blueprint = RelayBlueprint::socket("0.0.0.0", 5005);
        let err = apply_overrides(&mut blueprint, &run_args(&["--serial"])).unwrap_err();
        assert!(matches!(err, CliError::ConfigValidation { .. }));
    }

    #[test]
    fn baud_without_serial_table_is_rejected() {
        let mut blueprint = RelayBlueprint::socket("0.0.0.0", 5005);
        let err = apply_overrides(&mut blueprint, &run_args(&["--baud", "9600"])).unwrap_err();
        assert!(matches!(err, CliError::ConfigValidation { .. }));
    }
}
