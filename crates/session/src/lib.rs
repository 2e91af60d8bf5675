//! # Session
//!
//! One relay session over one established link.
//!
//! `Session::new` prepares the shared state; `Session::begin` starts the
//! four loops concurrently:
//!
//! - **Listener**: transport reads, frame reassembly, ingest queue
//! - **Sender**: best entry of the dispatch queue, chunked transport writes
//! - **Heartbeat**: periodic `heartbeat` log at `Priority::Info`
//! - **Ingest**: frame decoding, routing of every log
//!
//! All four share one `RunState`. The first fatal transport error stops
//! the session for every loop; a stopped session cannot be restarted.

pub mod error;
mod heartbeat;
mod ingest;
mod listener;
pub mod queue;
mod sender;
pub mod session;
pub mod state;
pub mod stats;

pub use error::SessionError;
pub use queue::{DispatchQueue, Outbox, QueueEntry};
pub use session::{RunningSession, Session};
pub use state::{LoopKind, RunState, StopReason};
pub use stats::{SessionReport, SessionStats};
