//! SessionClock - session-relative time base

use std::time::{Duration, Instant};

/// Timestamp captured once at session start
///
/// Copyable and read-only after construction; every outgoing timestamp is
/// expressed relative to it.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    /// Start a clock at the current instant
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Instant the session started
    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// Time elapsed since the session started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Seconds since start, rounded to milliseconds
    pub fn timestamp(&self) -> f64 {
        round_millis(self.elapsed().as_secs_f64())
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_millisecond_rounded() {
        assert_eq!(round_millis(1.23456), 1.235);
        assert_eq!(round_millis(0.0004), 0.0);
    }

    #[test]
    fn timestamp_is_monotonic() {
        let clock = SessionClock::start();
        let a = clock.timestamp();
        std::thread::sleep(Duration::from_millis(5));
        let b = clock.timestamp();
        assert!(b >= a);
        assert!(b >= 0.005);
    }
}
