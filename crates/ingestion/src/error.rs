//! Ingestion error types

use contracts::{ContractError, ParseError};
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Frame content could not be decoded
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Packet could not be framed
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Ingest queue closed
    #[error("ingest queue closed")]
    ChannelClosed,
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
