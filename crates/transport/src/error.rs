//! Transport error types

use contracts::ContractError;
use thiserror::Error;

/// Link failure
///
/// Always fatal: the session stops when a loop observes one.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Serial device could not be opened or configured
    #[error("failed to open serial device '{device}': {message}")]
    OpenFailed { device: String, message: String },

    /// Socket server could not bind or accept
    #[error("failed to accept peer on {endpoint}: {message}")]
    AcceptFailed { endpoint: String, message: String },

    /// Peer closed the connection
    #[error("link closed by peer ({peer})")]
    Closed { peer: String },

    /// Read or write failure on an established link
    #[error("{op} failed on {link}: {source}")]
    Io {
        op: &'static str,
        link: String,
        #[source]
        source: std::io::Error,
    },

    /// Blocking I/O task was cancelled or panicked
    #[error("blocking {op} task failed: {message}")]
    Task { op: &'static str, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl TransportError {
    /// Create I/O error for an established link
    pub fn io(op: &'static str, link: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            link: link.into(),
            source,
        }
    }

    /// Create peer-closed error
    pub fn closed(peer: impl Into<String>) -> Self {
        Self::Closed { peer: peer.into() }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TransportError>;
