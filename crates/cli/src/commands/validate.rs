//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, SinkType, TransportSelection};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::relay::link_label;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    link: String,
    send_enabled: bool,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(&args.config);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(path: &Path) -> ValidationResult {
    let config_path = path.display().to_string();

    if !path.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", path.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(path) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    link: link_label(&blueprint.transport),
                    send_enabled: blueprint.session.send_enabled,
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - decoded logs will be dropped".to_string());
    } else if !blueprint
        .sinks
        .iter()
        .any(|s| s.sink_type == SinkType::File)
    {
        warnings.push("No file sink configured - logs will not be persisted".to_string());
    }

    if !blueprint.session.send_enabled {
        warnings.push(
            "session.send_enabled is false - heartbeats and commands stay queued".to_string(),
        );
    }

    if blueprint.session.heartbeat_interval_ms < blueprint.session.send_interval_ms {
        warnings.push(
            "heartbeat_interval_ms is shorter than send_interval_ms - the queue will grow"
                .to_string(),
        );
    }

    if let Ok(TransportSelection::Serial(serial)) = blueprint.transport.selection() {
        if serial.chunk_delay_ms == 0 {
            warnings.push(
                "transport.serial.chunk_delay_ms is 0 - the radio may drop back-to-back chunks"
                    .to_string(),
            );
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Link: {}", summary.link);
            println!("  Sending: {}", if summary.send_enabled { "on" } else { "off" });
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
