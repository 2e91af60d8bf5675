//! Operator commands read from stdin
//!
//! One JSON `ControlCommand` per line. Malformed lines are logged and
//! skipped.

use std::io::BufRead;

use dispatcher::{ControlCommand, LogRouter};
use session::{Outbox, RunState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::CliError;

/// Start reading stdin and applying each command to `router`
///
/// Stdin is read on a detached thread so a blocked read never holds up
/// process exit. The returned task ends when the session stops or stdin
/// closes.
pub fn spawn_stdin_control(
    router: LogRouter<Outbox>,
    state: RunState,
) -> Result<JoinHandle<u64>, CliError> {
    let (lines_tx, lines_rx) = mpsc::channel(64);

    std::thread::Builder::new()
        .name("control-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if lines_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;

    Ok(tokio::spawn(apply_commands(router, lines_rx, state)))
}

/// Apply commands until the session stops or the input closes
///
/// Returns the number of commands applied.
pub(crate) async fn apply_commands(
    router: LogRouter<Outbox>,
    mut lines: mpsc::Receiver<String>,
    state: RunState,
) -> u64 {
    let mut applied = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = state.stopped() => break,
            line = lines.recv() => match line {
                Some(line) => line,
                None => {
                    info!("control input closed");
                    break;
                }
            },
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match ControlCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "malformed control command skipped");
                continue;
            }
        };

        match router.handle_control(command).await {
            Ok(outcome) => {
                applied += 1;
                debug!(?outcome, "control command applied");
            }
            Err(e) => warn!(error = %e, "control command failed"),
        }
    }

    applied
}
