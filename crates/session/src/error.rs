//! Session error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Link could not be established
    #[error("transport error: {0}")]
    Transport(#[from] transport::TransportError),

    /// Invalid configuration or packet
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}
