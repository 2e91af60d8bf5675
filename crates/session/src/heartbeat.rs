//! Heartbeat loop: periodic liveness packets

use std::sync::Arc;
use std::time::Duration;

use contracts::{Log, OutboundQueue, Packet, Priority, SessionClock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, instrument, warn};

use crate::queue::Outbox;
use crate::state::RunState;
use crate::stats::SessionStats;

pub(crate) const HEARTBEAT_HEADER: &str = "heartbeat";

pub(crate) struct Heartbeat {
    pub outbox: Outbox,
    pub clock: SessionClock,
    pub period: Duration,
    pub state: RunState,
    pub stats: Arc<SessionStats>,
}

impl Heartbeat {
    #[instrument(name = "heartbeat_loop", skip(self), fields(period_ms = self.period.as_millis() as u64))]
    pub async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut counter: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.state.stopped() => break,
                _ = ticker.tick() => {}
            }

            let log = Log::new(
                HEARTBEAT_HEADER,
                format!("AT - {counter}"),
                self.clock.timestamp(),
            );
            match self.outbox.enqueue(Packet::single(log, Priority::Info)) {
                Ok(sequence) => {
                    self.stats.record_heartbeat();
                    observability::record_heartbeat(counter);
                    debug!(counter, sequence, "heartbeat queued");
                }
                Err(e) => warn!(counter, error = %e, "heartbeat not queued"),
            }
            counter += 1;
        }

        debug!(sent = counter, "heartbeat stopped");
    }
}
