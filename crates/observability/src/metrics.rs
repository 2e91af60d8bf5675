//! Relay metric recorders
//!
//! Thin wrappers over the `metrics` facade so every crate uses the same
//! metric names and labels. Without an installed recorder these are no-ops.

use contracts::{LogCategory, Priority};
use metrics::{counter, gauge, histogram};

/// Record one outbound frame written to the transport
pub fn record_frame_sent(priority: Priority, bytes: usize, chunks: usize) {
    counter!(
        "telemetry_relay_frames_sent_total",
        "priority" => priority.as_str()
    )
    .increment(1);
    counter!("telemetry_relay_bytes_sent_total").increment(bytes as u64);
    histogram!("telemetry_relay_frame_chunks").record(chunks as f64);
}

/// Record a complete inbound frame
pub fn record_frame_received(bytes: usize) {
    counter!("telemetry_relay_frames_received_total").increment(1);
    histogram!("telemetry_relay_frame_bytes").record(bytes as f64);
}

/// Record a frame dropped because it did not decode
pub fn record_parse_error() {
    counter!("telemetry_relay_parse_errors_total").increment(1);
}

/// Record the current dispatch queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("telemetry_relay_dispatch_queue_depth").set(depth as f64);
}

/// Record an enqueued heartbeat
pub fn record_heartbeat(counter_value: u64) {
    counter!("telemetry_relay_heartbeats_total").increment(1);
    gauge!("telemetry_relay_last_heartbeat").set(counter_value as f64);
}

/// Record an event handed to a sink
///
/// `status` is one of `success`, `failure` or `dropped`.
pub fn record_event_dispatched(sink_name: &str, status: &'static str) {
    counter!(
        "telemetry_relay_events_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a routed inbound log
pub fn record_log_routed(category: LogCategory) {
    counter!(
        "telemetry_relay_logs_routed_total",
        "category" => category.as_str()
    )
    .increment(1);
}

/// Record how long a single transport write took
pub fn record_write_latency_ms(latency_ms: f64) {
    histogram!("telemetry_relay_write_latency_ms").record(latency_ms);
}

/// Summary of a `RunningStats`
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
