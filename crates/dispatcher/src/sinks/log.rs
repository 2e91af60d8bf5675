//! LogSink - writes events through tracing

use contracts::{ContractError, DataSink, RelayEvent};
use tracing::{debug, info, instrument};

/// Sink that reports every event in the process log
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_event(&self, event: &RelayEvent) {
        match event {
            RelayEvent::Save { log } => info!(
                sink = %self.name,
                header = %log.header,
                timestamp = log.timestamp,
                message = %log.message.to_value(),
                "log saved"
            ),
            RelayEvent::Emit { topic, payload } => info!(
                sink = %self.name,
                %topic,
                payload = %payload,
                "event emitted"
            ),
            RelayEvent::Put { record } => info!(
                sink = %self.name,
                timestamp = record.timestamp,
                sensors = record.readings.len(),
                "sensor record stored"
            ),
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, event),
        fields(sink = %self.name, kind = event.kind())
    )]
    async fn write(&mut self, event: &RelayEvent) -> Result<(), ContractError> {
        self.log_event(event);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Log, Topic};
    use serde_json::json;

    #[tokio::test]
    async fn accepts_every_kind() {
        let mut sink = LogSink::new("console");
        assert_eq!(sink.name(), "console");

        let events = [
            RelayEvent::Save {
                log: Log::new("stage", "armed", 1.0),
            },
            RelayEvent::Emit {
                topic: Topic::General,
                payload: json!({"header": "stage"}),
            },
        ];
        for event in &events {
            assert!(sink.write(event).await.is_ok());
        }
        assert!(sink.close().await.is_ok());
    }
}
