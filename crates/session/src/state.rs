//! Shared running state
//!
//! Starts running and is stopped exactly once. The first caller of `stop`
//! records the reason; every later call is a no-op.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

/// The four session loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Listener,
    Sender,
    Heartbeat,
    Ingest,
}

impl LoopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listener => "listener",
            Self::Sender => "sender",
            Self::Heartbeat => "heartbeat",
            Self::Ingest => "ingest",
        }
    }
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop` was called by the owner
    Requested,
    /// A loop hit a fatal link error
    TransportFailed { stage: LoopKind, error: String },
    /// The event dispatcher went away
    RouterClosed,
    /// A loop task ended abnormally
    Aborted { stage: LoopKind, message: String },
}

impl StopReason {
    pub fn transport(stage: LoopKind, error: impl fmt::Display) -> Self {
        Self::TransportFailed {
            stage,
            error: error.to_string(),
        }
    }

    /// True for stops caused by a failure rather than a request
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Requested)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "stop requested"),
            Self::TransportFailed { stage, error } => {
                write!(f, "transport failure in {stage}: {error}")
            }
            Self::RouterClosed => write!(f, "event dispatcher closed"),
            Self::Aborted { stage, message } => write!(f, "{stage} loop aborted: {message}"),
        }
    }
}

/// Cloneable handle to the session's running flag
#[derive(Debug, Clone)]
pub struct RunState {
    running: Arc<watch::Sender<bool>>,
    reason: Arc<OnceLock<StopReason>>,
}

impl RunState {
    pub fn new() -> Self {
        let (running, _) = watch::channel(true);
        Self {
            running: Arc::new(running),
            reason: Arc::new(OnceLock::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Stop the session
    ///
    /// Returns true if this call performed the stop.
    pub fn stop(&self, reason: StopReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        self.running.send_replace(false);
        true
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.reason.get()
    }

    /// Resolve once the session is stopped
    pub async fn stopped(&self) {
        let mut rx = self.running.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|running| !*running).await;
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
