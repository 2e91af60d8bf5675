//! DataSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for external sinks.

use crate::{ContractError, RelayEvent};

/// Data output trait
///
/// All sink implementations must implement this trait. A sink receives
/// every event and ignores the kinds it does not handle.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one relay event
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, event: &RelayEvent) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
