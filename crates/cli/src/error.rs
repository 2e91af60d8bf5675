//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration rejected after CLI overrides were applied
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// The link could not be established
    #[error("Failed to open {link}: {message}")]
    Connect { link: String, message: String },

    /// The session stopped because of a failure
    #[error("Relay session failed: {reason}")]
    SessionFailed { reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn connect(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            link: link.into(),
            message: message.into(),
        }
    }

    pub fn session_failed(reason: impl Into<String>) -> Self {
        Self::SessionFailed {
            reason: reason.into(),
        }
    }
}
