//! Relay orchestrator - wires the dispatcher, the session and the control
//! input together and tears them down in order.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, TransportConfig, TransportSelection};
use dispatcher::create_dispatcher;
use session::Session;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use super::control::spawn_stdin_control;
use super::RelayStats;
use crate::error::CliError;

/// Relay run configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub blueprint: RelayBlueprint,

    /// Stop after this long (None = until interrupted or the link fails)
    pub duration: Option<Duration>,

    /// Read operator commands from stdin
    pub control_stdin: bool,

    /// Router-to-dispatcher channel capacity
    pub event_buffer: usize,
}

pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run one session to completion
    ///
    /// Shutdown order: stop the session, wait for its loops, end the control
    /// task, then let the dispatcher drain and collect its sink counters.
    #[instrument(name = "relay_run", skip(self), fields(link = %link_label(&self.config.blueprint.transport)))]
    pub async fn run(self) -> Result<RelayStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let link = link_label(&blueprint.transport);

        let (events_tx, events_rx) = mpsc::channel(self.config.event_buffer.max(1));
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), events_rx)
            .await
            .context("Failed to create dispatcher")?;
        info!(sinks = ?dispatcher.sink_names(), "Dispatcher ready");
        let dispatcher_task = dispatcher.spawn();

        info!(link = %link, "Opening link");
        let connected = tokio::select! {
            result = Session::connect(blueprint, events_tx) => Some(result),
            _ = shutdown_signal() => None,
        };
        let session = match connected {
            Some(result) => result.map_err(|e| CliError::connect(link.clone(), e.to_string()))?,
            None => {
                warn!("Shutdown requested before the link was established");
                let sinks = dispatcher_task.await.context("Dispatcher task failed")?;
                return Ok(RelayStats {
                    duration: start_time.elapsed(),
                    session: None,
                    sinks,
                });
            }
        };

        let running = session.begin();
        let state = running.state();

        let control = if self.config.control_stdin {
            info!("Reading control commands from stdin");
            Some(spawn_stdin_control(running.router(), state.clone())?)
        } else {
            None
        };

        tokio::select! {
            _ = state.stopped() => {
                if let Some(reason) = state.stop_reason() {
                    warn!(reason = %reason, "Session stopped");
                }
            }
            _ = shutdown_signal() => {
                info!("Received shutdown signal, stopping relay...");
            }
            _ = run_limit(self.config.duration) => {
                info!("Run duration elapsed, stopping relay...");
            }
        }

        let report = running.shutdown().await;

        if let Some(control) = control {
            match control.await {
                Ok(applied) => info!(applied, "Control input finished"),
                Err(e) => warn!(error = %e, "Control task failed"),
            }
        }

        // Every router clone is gone now, so the event channel closes and
        // the dispatcher drains its sink workers
        let sinks = dispatcher_task.await.context("Dispatcher task failed")?;

        Ok(RelayStats {
            duration: start_time.elapsed(),
            session: Some(report),
            sinks,
        })
    }
}

/// Human readable description of the selected link
pub fn link_label(transport: &TransportConfig) -> String {
    match transport.selection() {
        Ok(TransportSelection::Serial(serial)) => {
            format!("serial {} @ {} baud", serial.device, serial.baud_rate)
        }
        Ok(TransportSelection::Socket(socket)) => format!("tcp {}", socket.endpoint()),
        Err(_) => "unconfigured link".to_string(),
    }
}

async fn run_limit(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
