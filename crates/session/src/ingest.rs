//! Ingest loop: decode frames and route their logs

use std::sync::Arc;
use std::time::Duration;

use dispatcher::LogRouter;
use ingestion::{FrameCodec, IngestReceiver, IngestionMetrics};
use tracing::{debug, error, instrument, trace, warn};

use crate::queue::Outbox;
use crate::state::{RunState, StopReason};
use crate::stats::SessionStats;

pub(crate) struct Ingest {
    pub frames: IngestReceiver,
    pub codec: FrameCodec,
    pub router: LogRouter<Outbox>,
    pub wait: Duration,
    pub state: RunState,
    pub metrics: Arc<IngestionMetrics>,
    pub stats: Arc<SessionStats>,
}

impl Ingest {
    #[instrument(name = "ingest_loop", skip(self), fields(codec = self.codec.codec_name()))]
    pub async fn run(self) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.state.stopped() => break,
                next = tokio::time::timeout(self.wait, self.frames.recv()) => next,
            };

            let frame = match next {
                Err(_) => {
                    trace!("ingest idle");
                    continue;
                }
                Ok(Err(_)) => {
                    debug!("ingest queue closed");
                    break;
                }
                Ok(Ok(frame)) => frame,
            };

            let packet = match self.codec.decode(&frame) {
                Ok(packet) => packet,
                Err(e) => {
                    self.metrics.record_parse_error();
                    observability::record_parse_error();
                    warn!(len = frame.len(), error = %e, "dropping malformed frame");
                    continue;
                }
            };
            self.metrics.record_decoded();

            for log in packet.into_logs() {
                if let Err(e) = self.router.route(log).await {
                    error!(error = %e, "router unavailable, stopping session");
                    self.state.stop(StopReason::RouterClosed);
                    return;
                }
                self.stats.record_log_routed();
            }
        }

        debug!("ingest stopped");
    }
}
