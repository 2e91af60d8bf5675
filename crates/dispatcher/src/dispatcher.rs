//! Dispatcher - fans router events out to every sink

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{DataSink, RelayEvent, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink};

#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

/// Builds a `Dispatcher` from configured sinks plus any added in code
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<RelayEvent>,
    extra: Vec<SinkHandle>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<RelayEvent>) -> Self {
        Self {
            config,
            input_rx,
            extra: Vec::new(),
        }
    }

    /// Attach a sink that is not described by configuration
    pub fn with_sink<S: DataSink + Send + 'static>(mut self, sink: S, queue_capacity: usize) -> Self {
        self.extra.push(SinkHandle::spawn(sink, queue_capacity));
        self
    }

    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut handles = Self::initialize_handles(&self.config).await?;
        handles.extend(self.extra);

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config).await?);
        }
        Ok(handles)
    }
}

#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };
    Ok(handle)
}

/// Consumes `RelayEvent`s and offers each one to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<RelayEvent>,
}

impl Dispatcher {
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<RelayEvent>) -> Self {
        Self { handles, input_rx }
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        collect_metrics(&self.handles)
    }

    /// Run until the input channel closes, then drain and close every sink
    ///
    /// Returns the final per-sink counters.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut event_count: u64 = 0;
        while let Some(event) = self.input_rx.recv().await {
            event_count += 1;
            self.dispatch_event(&event);

            if event_count.is_multiple_of(100) {
                debug!(events = event_count, "Dispatcher progress");
            }
        }

        info!(events = event_count, "Dispatcher input closed, shutting down");

        // Handles keep their counters after the workers stop
        let metrics: Vec<_> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), std::sync::Arc::clone(h.metrics())))
            .collect();
        for handle in self.handles {
            handle.shutdown().await;
        }

        info!("Dispatcher shutdown complete");
        metrics
            .into_iter()
            .map(|(name, m)| (name, m.snapshot()))
            .collect()
    }

    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    fn dispatch_event(&self, event: &RelayEvent) {
        for handle in &self.handles {
            handle.try_send(event.clone());
        }
    }
}

fn collect_metrics(handles: &[SinkHandle]) -> Vec<(String, MetricsSnapshot)> {
    handles
        .iter()
        .map(|h| (h.name().to_string(), h.metrics().snapshot()))
        .collect()
}

/// Build a dispatcher from sink configurations
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<RelayEvent>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::ChannelSink;
    use contracts::{Log, Topic};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn fans_out_to_every_sink() {
        let (input_tx, input_rx) = mpsc::channel(10);
        let (first, mut first_rx) = ChannelSink::new("first", 16);
        let (second, mut second_rx) = ChannelSink::new("second", 16);

        let handles = vec![SinkHandle::spawn(first, 10), SinkHandle::spawn(second, 10)];
        let handle = Dispatcher::with_handles(handles, input_rx).spawn();

        for i in 0..3 {
            let event = RelayEvent::Save {
                log: Log::new("stage", format!("s{i}"), i as f64),
            };
            input_tx.send(event).await.unwrap();
        }
        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.iter().all(|(_, m)| m.write_count == 3));

        for rx in [&mut first_rx, &mut second_rx] {
            for i in 0..3 {
                match rx.recv().await.unwrap() {
                    RelayEvent::Save { log } => assert_eq!(log.timestamp, i as f64),
                    other => panic!("unexpected event: {other:?}"),
                }
            }
        }
    }

    #[tokio::test]
    async fn builds_from_config() {
        let (input_tx, input_rx) = mpsc::channel(10);
        let configs = vec![SinkConfig {
            name: "console".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let (channel, mut rx) = ChannelSink::new("bus", 4);
        let dispatcher = DispatcherBuilder::new(DispatcherConfig { sinks: configs }, input_rx)
            .with_sink(channel, 10)
            .build()
            .await
            .unwrap();
        assert_eq!(dispatcher.sink_names(), vec!["console", "bus"]);

        let handle = dispatcher.spawn();
        input_tx
            .send(RelayEvent::Emit {
                topic: Topic::ValveData,
                payload: json!({"v1": 1}),
            })
            .await
            .unwrap();
        drop(input_tx);
        handle.await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), RelayEvent::Emit { .. }));
    }

    #[tokio::test]
    async fn invalid_network_sink_fails_to_build() {
        let (_tx, input_rx) = mpsc::channel(1);
        let configs = vec![SinkConfig {
            name: "ui".to_string(),
            sink_type: SinkType::Network,
            queue_capacity: 10,
            params: HashMap::from([("addr".to_string(), "not an address".to_string())]),
        }];

        let err = create_dispatcher(configs, input_rx).await.err().unwrap();
        assert!(err.to_string().contains("ui"), "got: {err}");
    }
}
