//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Event channel to the dispatcher is closed
    #[error("event channel closed, {kind} event lost")]
    ChannelClosed { kind: &'static str },

    /// Control command could not be parsed
    #[error("invalid control command: {0}")]
    InvalidCommand(#[from] serde_json::Error),

    /// Forwarded command payload is neither text nor a map
    #[error("command '{header}' carries a {kind} message, expected text or an object")]
    UnsupportedMessage { header: String, kind: &'static str },

    /// Sink write or enqueue error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
