//! Session counters and the end-of-run report

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dispatcher::RouterSnapshot;
use observability::{RunningStats, StatsSummary};

use crate::state::StopReason;

/// Counters written by the loops
#[derive(Debug, Default)]
pub struct SessionStats {
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    chunks_sent: AtomicU64,
    heartbeats: AtomicU64,
    logs_routed: AtomicU64,
    write_latency_ms: Mutex<RunningStats>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_sent(&self, bytes: usize, chunks: usize, latency: Duration) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.chunks_sent.fetch_add(chunks as u64, Ordering::Relaxed);
        self.write_latency_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(latency.as_secs_f64() * 1000.0);
    }

    pub fn record_heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_routed(&self) {
        self.logs_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    pub fn logs_routed(&self) -> u64 {
        self.logs_routed.load(Ordering::Relaxed)
    }

    pub(crate) fn write_latency(&self) -> StatsSummary {
        self.write_latency_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }
}

/// Summary of a finished session
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub duration: Duration,
    pub stop_reason: Option<StopReason>,

    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub chunks_sent: u64,
    pub heartbeats: u64,
    /// Frames still queued when the session stopped
    pub unsent: usize,
    pub write_latency_ms: StatsSummary,

    pub frames_received: u64,
    pub frames_decoded: u64,
    pub parse_errors: u64,
    pub bytes_discarded: u64,
    pub resyncs: u64,
    pub logs_routed: u64,

    pub router: RouterSnapshot,
}

impl SessionReport {
    pub(crate) fn collect(
        duration: Duration,
        stop_reason: Option<StopReason>,
        stats: &SessionStats,
        ingestion: ingestion::MetricsSnapshot,
        router: RouterSnapshot,
        unsent: usize,
    ) -> Self {
        Self {
            duration,
            stop_reason,
            frames_sent: stats.frames_sent(),
            bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
            chunks_sent: stats.chunks_sent.load(Ordering::Relaxed),
            heartbeats: stats.heartbeats(),
            unsent,
            write_latency_ms: stats.write_latency(),
            frames_received: ingestion.frames_extracted,
            frames_decoded: ingestion.frames_decoded,
            parse_errors: ingestion.parse_errors,
            bytes_discarded: ingestion.bytes_discarded,
            resyncs: ingestion.resyncs,
            logs_routed: stats.logs_routed(),
            router,
        }
    }

    /// True when the session ended because of a failure
    pub fn failed(&self) -> bool {
        self.stop_reason
            .as_ref()
            .is_some_and(StopReason::is_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_reflects_counters() {
        let stats = SessionStats::new();
        stats.record_frame_sent(200, 4, Duration::from_millis(600));
        stats.record_frame_sent(50, 1, Duration::from_millis(2));
        stats.record_heartbeat();
        stats.record_log_routed();

        let report = SessionReport::collect(
            Duration::from_secs(3),
            Some(StopReason::Requested),
            &stats,
            ingestion::MetricsSnapshot::default(),
            RouterSnapshot::default(),
            2,
        );

        assert_eq!(report.frames_sent, 2);
        assert_eq!(report.bytes_sent, 250);
        assert_eq!(report.chunks_sent, 5);
        assert_eq!(report.heartbeats, 1);
        assert_eq!(report.unsent, 2);
        assert_eq!(report.write_latency_ms.count, 2);
        assert!(!report.failed());
    }
}
