//! Reassembly limits and ingestion metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Default reassembly accumulator limit (64 KiB)
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

/// Ingestion metrics
///
/// Shared between the Listener (reassembly, queueing) and the Ingest loop
/// (decoding).
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Complete frames extracted from the byte stream
    pub frames_extracted: AtomicU64,

    /// Frames handed to the ingest queue
    pub frames_queued: AtomicU64,

    /// Frames decoded into packets
    pub frames_decoded: AtomicU64,

    /// Frames dropped because they failed to decode
    pub parse_errors: AtomicU64,

    /// Bytes dropped by reassembly (garbage, stray delimiters, resyncs)
    pub bytes_discarded: AtomicU64,

    /// Accumulator overflows
    pub resyncs: AtomicU64,

    /// Current ingest queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_extracted(&self) {
        self.frames_extracted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queued(&self) {
        self.frames_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, bytes: usize) {
        self.bytes_discarded
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_resync(&self) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_extracted: self.frames_extracted.load(Ordering::Relaxed),
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_extracted: u64,
    pub frames_queued: u64,
    pub frames_decoded: u64,
    pub parse_errors: u64,
    pub bytes_discarded: u64,
    pub resyncs: u64,
    pub queue_len: usize,
}
