//! ChannelSink - in-process broadcast of relay events

use contracts::{ContractError, DataSink, RelayEvent};
use tokio::sync::broadcast;
use tracing::trace;

/// Re-publishes every event on a tokio broadcast channel
///
/// Having no subscribers is not an error; the event is simply not seen.
pub struct ChannelSink {
    name: String,
    tx: broadcast::Sender<RelayEvent>,
}

impl ChannelSink {
    /// Create the sink and a first subscriber
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, broadcast::Receiver<RelayEvent>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.tx.subscribe()
    }
}

impl DataSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, event: &RelayEvent) -> Result<(), ContractError> {
        let receivers = self.tx.send(event.clone()).unwrap_or(0);
        trace!(sink = %self.name, receivers, kind = event.kind(), "event published");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
