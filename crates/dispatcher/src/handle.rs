//! SinkHandle - one sink behind its own bounded queue and worker task

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{DataSink, RelayEvent};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<RelayEvent>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn a worker owning `sink`
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Offer an event without waiting
    ///
    /// Returns false when the queue is full (event dropped for this sink
    /// only) or the worker is gone.
    pub fn try_send(&self, event: RelayEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.metrics.inc_dropped_count();
                observability::record_event_dispatched(&self.name, "dropped");
                warn!(sink = %self.name, kind = event.kind(), "Sink queue full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Close the queue and wait for the worker to drain it
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Sink worker panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

#[instrument(name = "sink_worker_loop", skip(sink, rx, metrics), fields(sink = %name))]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<RelayEvent>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!("Sink worker started");

    while let Some(event) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&event).await {
            Ok(()) => {
                metrics.inc_write_count();
                observability::record_event_dispatched(&name, "success");
            }
            Err(e) => {
                // A failing write never stops the worker
                metrics.inc_failure_count();
                observability::record_event_dispatched(&name, "failure");
                error!(kind = event.kind(), error = %e, "Sink write failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "Close failed on shutdown");
    }

    debug!("Sink worker stopped");
}
