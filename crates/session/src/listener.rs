//! Listener loop: transport reads into the ingest queue

use std::time::Duration;

use ingestion::{FrameAssembler, IngestSender};
use tracing::{debug, error, instrument, trace};
use transport::TransportReader;

use crate::state::{LoopKind, RunState, StopReason};

pub(crate) struct Listener<R> {
    pub reader: R,
    pub read_size: usize,
    pub assembler: FrameAssembler,
    pub ingest: IngestSender,
    pub idle_interval: Duration,
    pub state: RunState,
}

impl<R: TransportReader> Listener<R> {
    #[instrument(name = "listener_loop", skip(self), fields(read_size = self.read_size))]
    pub async fn run(mut self) {
        debug!("listener started");

        'outer: while self.state.is_running() {
            let read = tokio::select! {
                biased;
                _ = self.state.stopped() => break,
                read = self.reader.read(self.read_size) => read,
            };

            let bytes = match read {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(error = %e, "transport read failed, stopping session");
                    self.state.stop(StopReason::transport(LoopKind::Listener, &e));
                    break;
                }
            };

            if bytes.is_empty() {
                tokio::select! {
                    _ = self.state.stopped() => break,
                    _ = tokio::time::sleep(self.idle_interval) => continue,
                }
            }

            trace!(len = bytes.len(), buffered = self.assembler.buffered(), "bytes received");
            for frame in self.assembler.push(&bytes) {
                observability::record_frame_received(frame.len());
                let submitted = tokio::select! {
                    _ = self.state.stopped() => break 'outer,
                    submitted = self.ingest.submit(frame) => submitted,
                };
                if submitted.is_err() {
                    debug!("ingest queue closed");
                    break 'outer;
                }
            }
        }

        self.ingest.close();
        debug!("listener stopped");
    }
}
