//! Sender loop: one frame per send interval, chunked per link policy

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use transport::{ChunkPolicy, TransportWriter};

use crate::queue::{DispatchQueue, QueueEntry};
use crate::state::{LoopKind, RunState, StopReason};
use crate::stats::SessionStats;

pub(crate) struct Sender<W> {
    pub writer: W,
    pub queue: Arc<DispatchQueue>,
    pub policy: ChunkPolicy,
    pub period: Duration,
    pub enabled: bool,
    pub state: RunState,
    pub stats: Arc<SessionStats>,
}

/// How far a frame got before the write stopped
enum Written {
    Complete(usize),
    Interrupted(usize),
}

impl<W: TransportWriter> Sender<W> {
    #[instrument(
        name = "sender_loop",
        skip(self),
        fields(period_ms = self.period.as_millis() as u64, enabled = self.enabled)
    )]
    pub async fn run(mut self) {
        if !self.enabled {
            info!("sending disabled, outbound frames stay queued");
        }

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.state.stopped() => break,
                _ = ticker.tick() => {}
            }

            if !self.enabled {
                continue;
            }
            let Some(entry) = self.queue.dequeue_best() else {
                continue;
            };
            observability::record_queue_depth(self.queue.len());

            let started = Instant::now();
            match self.write_frame(&entry).await {
                Ok(Written::Complete(chunks)) => {
                    let latency = started.elapsed();
                    self.stats
                        .record_frame_sent(entry.payload.len(), chunks, latency);
                    observability::record_frame_sent(entry.priority, entry.payload.len(), chunks);
                    observability::record_write_latency_ms(latency.as_secs_f64() * 1000.0);
                    debug!(
                        sequence = entry.sequence,
                        priority = entry.priority.as_str(),
                        bytes = entry.payload.len(),
                        chunks,
                        "frame sent"
                    );
                }
                Ok(Written::Interrupted(chunks)) => {
                    warn!(sequence = entry.sequence, chunks, "frame cut short by shutdown");
                    break;
                }
                Err(e) => {
                    error!(sequence = entry.sequence, error = %e, "transport write failed, stopping session");
                    self.state.stop(StopReason::transport(LoopKind::Sender, &e));
                    break;
                }
            }
        }

        if let Err(e) = self.writer.close().await {
            debug!(error = %e, "closing writer failed");
        }
        debug!("sender stopped");
    }

    /// Write one frame, waiting `policy.delay` between chunks
    async fn write_frame(&mut self, entry: &QueueEntry) -> transport::Result<Written> {
        let mut written = 0;
        for chunk in self.policy.chunks(&entry.payload) {
            if written > 0 && !self.policy.delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.state.stopped() => return Ok(Written::Interrupted(written)),
                    _ = tokio::time::sleep(self.policy.delay) => {}
                }
            }
            self.writer.write_all(chunk).await?;
            written += 1;
        }
        Ok(Written::Complete(written))
    }
}
