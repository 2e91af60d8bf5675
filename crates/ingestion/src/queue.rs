//! Ingest queue
//!
//! Bounded hand-off between the Listener (producer) and the Ingest loop
//! (consumer). The producer waits for capacity instead of dropping frames.

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TryRecvError};
use bytes::Bytes;

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

/// Bounded frame queue
pub struct IngestQueue {
    tx: Sender<Bytes>,
    rx: Receiver<Bytes>,
    metrics: Arc<IngestionMetrics>,
}

impl IngestQueue {
    /// Create a queue holding at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        Self::with_metrics(capacity, Arc::new(IngestionMetrics::new()))
    }

    pub fn with_metrics(capacity: usize, metrics: Arc<IngestionMetrics>) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx, metrics }
    }

    pub fn sender(&self) -> IngestSender {
        IngestSender {
            tx: self.tx.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn receiver(&self) -> IngestReceiver {
        IngestReceiver {
            rx: self.rx.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Producer side, owned by the Listener
#[derive(Clone)]
pub struct IngestSender {
    tx: Sender<Bytes>,
    metrics: Arc<IngestionMetrics>,
}

impl IngestSender {
    /// Queue a frame, waiting for capacity
    ///
    /// # Errors
    /// `IngestionError::ChannelClosed` when every receiver is gone
    pub async fn submit(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| IngestionError::ChannelClosed)?;
        self.metrics.record_queued();
        self.metrics.update_queue_len(self.tx.len());
        Ok(())
    }

    /// Stop accepting frames; the receiver drains what is left
    pub fn close(&self) -> bool {
        self.tx.close()
    }
}

/// Consumer side, owned by the Ingest loop
#[derive(Clone)]
pub struct IngestReceiver {
    rx: Receiver<Bytes>,
    metrics: Arc<IngestionMetrics>,
}

impl IngestReceiver {
    /// Wait for the next frame
    ///
    /// # Errors
    /// `IngestionError::ChannelClosed` once the queue is closed and empty
    pub async fn recv(&self) -> Result<Bytes> {
        let frame = self
            .rx
            .recv()
            .await
            .map_err(|_| IngestionError::ChannelClosed)?;
        self.metrics.update_queue_len(self.rx.len());
        Ok(frame)
    }

    /// Take a frame if one is ready
    pub fn try_recv(&self) -> Result<Option<Bytes>> {
        match self.rx.try_recv() {
            Ok(frame) => {
                self.metrics.update_queue_len(self.rx.len());
                Ok(Some(frame))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(IngestionError::ChannelClosed),
        }
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_delivered_in_order() {
        let queue = IngestQueue::new(4);
        let tx = queue.sender();
        let rx = queue.receiver();

        for frame in ["a", "b", "c"] {
            tx.tx.send_blocking(Bytes::from(frame)).unwrap();
        }
        assert_eq!(queue.len(), 3);

        let got: Vec<Bytes> = std::iter::from_fn(|| rx.try_recv().unwrap()).collect();
        assert_eq!(got, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn closed_queue_drains_then_errors() {
        let queue = IngestQueue::new(2);
        let tx = queue.sender();
        let rx = queue.receiver();
        tx.tx.send_blocking(Bytes::from_static(b"last")).unwrap();
        assert!(tx.close());

        assert_eq!(rx.try_recv().unwrap(), Some(Bytes::from_static(b"last")));
        assert!(matches!(rx.try_recv(), Err(IngestionError::ChannelClosed)));
    }

    #[tokio::test]
    async fn submit_records_metrics() {
        let queue = IngestQueue::new(2);
        queue.sender().submit(Bytes::from_static(b"x")).await.unwrap();

        let snapshot = queue.metrics().snapshot();
        assert_eq!(snapshot.frames_queued, 1);
        assert_eq!(snapshot.queue_len, 1);

        assert_eq!(queue.receiver().recv().await.unwrap(), "x");
        assert_eq!(queue.metrics().snapshot().queue_len, 0);
    }
}
