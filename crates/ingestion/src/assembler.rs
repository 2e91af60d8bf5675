//! Frame reassembly
//!
//! The Listener owns one `FrameAssembler` and feeds it every read. Complete
//! frames come out in the order they complete, which is arrival order.
//!
//! Rules:
//! - a frame ends at the first `DELIM_END` and starts at the last
//!   `DELIM_START` before it; everything earlier is dropped
//! - a `DELIM_END` with no `DELIM_START` before it is dropped with the
//!   bytes preceding it
//! - once no complete frame remains, the accumulator is held under
//!   `max_buffer`: keep the tail from the last `DELIM_START` if it fits,
//!   otherwise clear everything (a resync)

use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use metrics::counter;
use tracing::{trace, warn};

use crate::config::{IngestionMetrics, DEFAULT_MAX_BUFFER};
use crate::frame::{DELIM_END, DELIM_START};

/// Streaming frame extractor
#[derive(Debug)]
pub struct FrameAssembler {
    buf: BytesMut,
    max_buffer: usize,
    metrics: Arc<IngestionMetrics>,
}

impl FrameAssembler {
    pub fn new(max_buffer: usize) -> Self {
        Self::with_metrics(max_buffer, Arc::new(IngestionMetrics::new()))
    }

    /// Create an assembler reporting into shared metrics
    pub fn with_metrics(max_buffer: usize, metrics: Arc<IngestionMetrics>) -> Self {
        Self {
            buf: BytesMut::new(),
            max_buffer: max_buffer.max(1),
            metrics,
        }
    }

    /// Append a read and extract every frame completed by it
    ///
    /// Returned frames are the content between the delimiters.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        self.enforce_limit();
        frames
    }

    /// Bytes currently held
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn max_buffer(&self) -> usize {
        self.max_buffer
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Drop everything buffered
    pub fn reset(&mut self) {
        let len = self.buf.len();
        self.discard(len);
    }

    fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            let end = self.buf.iter().position(|b| *b == DELIM_END)?;
            match self.buf[..end].iter().rposition(|b| *b == DELIM_START) {
                Some(start) => {
                    self.discard(start);
                    let mut frame = self.buf.split_to(end - start + 1);
                    frame.advance(1);
                    frame.truncate(frame.len() - 1);

                    self.metrics.record_extracted();
                    trace!(len = frame.len(), "frame extracted");
                    return Some(frame.freeze());
                }
                None => {
                    trace!(len = end + 1, "dropping stray end delimiter");
                    self.discard(end + 1);
                }
            }
        }
    }

    fn enforce_limit(&mut self) {
        let buffered = self.buf.len();
        if buffered <= self.max_buffer {
            return;
        }

        let drop_len = self
            .buf
            .iter()
            .rposition(|b| *b == DELIM_START)
            .filter(|start| buffered - start <= self.max_buffer)
            .unwrap_or(buffered);

        warn!(
            buffered,
            max_buffer = self.max_buffer,
            dropped = drop_len,
            "reassembly buffer over limit, resyncing"
        );
        self.discard(drop_len);
        self.metrics.record_resync();
        counter!("telemetry_relay_reassembly_resyncs_total").increment(1);
    }

    fn discard(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.buf.advance(len);
        self.metrics.record_discarded(len);
        counter!("telemetry_relay_reassembly_discarded_bytes_total").increment(len as u64);
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER)
    }
}
