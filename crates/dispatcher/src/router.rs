//! LogRouter - classification and routing of decoded logs
//!
//! Inbound: each decoded `Log` becomes `RelayEvent`s for the sinks:
//!
//! | category     | events, in order                         |
//! |--------------|------------------------------------------|
//! | sensor       | `Put` (if well formed), `Emit`, `Save`   |
//! | valve        | `Emit`, `Save`                           |
//! | general      | `Emit`, `Save`                           |
//! | unclassified | `Save`                                   |
//!
//! Control: operator commands update or snapshot the `CategoryCache`, or
//! are turned into outbound packets on the `OutboundQueue`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{
    Log, LogCategory, LogMessage, OutboundQueue, Packet, Priority, RelayEvent, SessionClock,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::cache::CategoryCache;
use crate::control::{ControlAction, ControlCommand, ControlOutcome};
use crate::error::DispatcherError;
use crate::sensor::sensor_record;

/// Routes inbound logs to sinks and operator commands to the uplink
pub struct LogRouter<Q> {
    events: mpsc::Sender<RelayEvent>,
    cache: Arc<CategoryCache>,
    outbound: Arc<Q>,
    clock: SessionClock,
    stats: Arc<RouterStats>,
}

impl<Q> Clone for LogRouter<Q> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            cache: Arc::clone(&self.cache),
            outbound: Arc::clone(&self.outbound),
            clock: self.clock,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<Q: OutboundQueue> LogRouter<Q> {
    pub fn new(events: mpsc::Sender<RelayEvent>, outbound: Arc<Q>, clock: SessionClock) -> Self {
        Self::with_cache(events, outbound, clock, Arc::new(CategoryCache::new()))
    }

    /// Share an existing cache (e.g. across sessions)
    pub fn with_cache(
        events: mpsc::Sender<RelayEvent>,
        outbound: Arc<Q>,
        clock: SessionClock,
        cache: Arc<CategoryCache>,
    ) -> Self {
        Self {
            events,
            cache,
            outbound,
            clock,
            stats: Arc::new(RouterStats::default()),
        }
    }

    pub fn cache(&self) -> &Arc<CategoryCache> {
        &self.cache
    }

    pub fn stats(&self) -> RouterSnapshot {
        self.stats.snapshot()
    }

    /// Route one decoded log
    ///
    /// # Errors
    /// `DispatcherError::ChannelClosed` once the dispatcher has stopped
    #[instrument(name = "router_route", skip(self, log), fields(header = %log.header))]
    pub async fn route(&self, log: Log) -> Result<LogCategory, DispatcherError> {
        let category = log.category();

        if category == LogCategory::Sensor {
            match sensor_record(&log) {
                Ok(record) => self.send(RelayEvent::Put { record }).await?,
                Err(e) => {
                    self.stats.malformed_sensor.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, timestamp = log.timestamp, "sensor log not stored");
                }
            }
        }

        match category.topic() {
            Some(topic) => {
                self.send(RelayEvent::Emit {
                    topic,
                    payload: log.to_value(),
                })
                .await?
            }
            None => {
                self.stats.unclassified.fetch_add(1, Ordering::Relaxed);
                debug!("no category for header, persisting only");
            }
        }

        self.send(RelayEvent::Save { log }).await?;

        self.stats.routed.fetch_add(1, Ordering::Relaxed);
        observability::record_log_routed(category);
        Ok(category)
    }

    /// Apply one operator command
    ///
    /// # Errors
    /// `ChannelClosed` if a snapshot cannot be emitted, `UnsupportedMessage`
    /// if a forwarded payload is not text or a map, or the queue's error if
    /// a forwarded command cannot be enqueued
    #[instrument(name = "router_handle_control", skip(self, command), fields(header = %command.header))]
    pub async fn handle_control(
        &self,
        command: ControlCommand,
    ) -> Result<ControlOutcome, DispatcherError> {
        self.stats.commands.fetch_add(1, Ordering::Relaxed);

        match command.action() {
            ControlAction::UpdateCache(category) => {
                self.cache.update(category, command.message);
                debug!(category = category.as_str(), "cache updated");
                Ok(ControlOutcome::CacheUpdated(category))
            }
            ControlAction::Snapshot => {
                for (category, payload) in self.cache.snapshot() {
                    self.send(RelayEvent::Emit {
                        topic: category.snapshot_topic(),
                        payload: payload.unwrap_or(Value::Null),
                    })
                    .await?;
                }
                debug!("cache snapshot emitted");
                Ok(ControlOutcome::SnapshotEmitted)
            }
            ControlAction::Forward => {
                let kind = json_kind(&command.message);
                let Some(message) = LogMessage::from_value(command.message) else {
                    return Err(DispatcherError::UnsupportedMessage {
                        header: command.header,
                        kind,
                    });
                };
                let log = Log::new(command.header, message, self.clock.timestamp());
                let header = log.header.clone();
                let sequence = self.outbound.enqueue(Packet::single(log, Priority::Info))?;
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                info!(%header, sequence, "operator command queued for uplink");
                Ok(ControlOutcome::Forwarded { sequence })
            }
        }
    }

    async fn send(&self, event: RelayEvent) -> Result<(), DispatcherError> {
        let kind = event.kind();
        self.events
            .send(event)
            .await
            .map_err(|_| DispatcherError::ChannelClosed { kind })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Router counters
#[derive(Debug, Default)]
pub struct RouterStats {
    routed: AtomicU64,
    unclassified: AtomicU64,
    malformed_sensor: AtomicU64,
    commands: AtomicU64,
    forwarded: AtomicU64,
}

impl RouterStats {
    pub fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            routed: self.routed.load(Ordering::Relaxed),
            unclassified: self.unclassified.load(Ordering::Relaxed),
            malformed_sensor: self.malformed_sensor.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterSnapshot {
    pub routed: u64,
    pub unclassified: u64,
    /// Sensor logs that could not be flattened
    pub malformed_sensor: u64,
    pub commands: u64,
    pub forwarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CacheCategory, ContractError, Topic};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingQueue {
        packets: Mutex<Vec<Packet>>,
    }

    impl OutboundQueue for RecordingQueue {
        fn enqueue(&self, packet: Packet) -> Result<u64, ContractError> {
            let mut packets = self.packets.lock().unwrap();
            packets.push(packet);
            Ok(packets.len() as u64 - 1)
        }
    }

    fn router() -> (
        LogRouter<RecordingQueue>,
        mpsc::Receiver<RelayEvent>,
        Arc<RecordingQueue>,
    ) {
        let (tx, rx) = mpsc::channel(32);
        let queue = Arc::new(RecordingQueue::default());
        let router = LogRouter::new(tx, Arc::clone(&queue), SessionClock::start());
        (router, rx, queue)
    }

    fn drain(rx: &mut mpsc::Receiver<RelayEvent>) -> Vec<RelayEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn general_log_emitted_then_saved() {
        let (router, mut rx, _) = router();
        let log = Log::new("stage", "ignition", 3.5);

        let category = router.route(log.clone()).await.unwrap();
        assert_eq!(category, LogCategory::General);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                RelayEvent::Emit {
                    topic: Topic::General,
                    payload: log.to_value(),
                },
                RelayEvent::Save { log },
            ]
        );
    }

    #[tokio::test]
    async fn sensor_log_stored_emitted_saved() {
        let (router, mut rx, _) = router();
        let log = Log::new(
            "sensor_data",
            LogMessage::from_value(json!({"pressure": {"tank": {"psi": 10}}})).unwrap(),
            4.0,
        );

        router.route(log).await.unwrap();
        let kinds: Vec<_> = drain(&mut rx).iter().map(RelayEvent::kind).collect();
        assert_eq!(kinds, vec!["put", "emit", "save"]);
    }

    #[tokio::test]
    async fn malformed_sensor_log_still_emitted_and_saved() {
        let (router, mut rx, _) = router();
        router
            .route(Log::new("sensor_data", "garbled", 1.0))
            .await
            .unwrap();

        let kinds: Vec<_> = drain(&mut rx).iter().map(RelayEvent::kind).collect();
        assert_eq!(kinds, vec!["emit", "save"]);
        assert_eq!(router.stats().malformed_sensor, 1);
    }

    #[tokio::test]
    async fn unclassified_log_only_saved() {
        let (router, mut rx, _) = router();
        let category = router
            .route(Log::new("telemetry", "x", 1.0))
            .await
            .unwrap();
        assert_eq!(category, LogCategory::Unclassified);

        let kinds: Vec<_> = drain(&mut rx).iter().map(RelayEvent::kind).collect();
        assert_eq!(kinds, vec!["save"]);
        assert_eq!(router.stats().unclassified, 1);
    }

    #[tokio::test]
    async fn closed_channel_is_reported() {
        let (router, rx, _) = router();
        drop(rx);
        let err = router
            .route(Log::new("stage", "x", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::ChannelClosed { .. }));
    }

    #[tokio::test]
    async fn update_then_snapshot() {
        let (router, mut rx, queue) = router();

        let outcome = router
            .handle_control(ControlCommand::new("update_valves", json!({"v1": "open"})))
            .await
            .unwrap();
        assert_eq!(outcome, ControlOutcome::CacheUpdated(CacheCategory::Valves));
        assert!(drain(&mut rx).is_empty());

        let outcome = router
            .handle_control(ControlCommand::new("store_data", Value::Null))
            .await
            .unwrap();
        assert_eq!(outcome, ControlOutcome::SnapshotEmitted);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[2],
            RelayEvent::Emit {
                topic: Topic::ValvesCopy,
                payload: json!({"v1": "open"}),
            }
        );
        assert_eq!(
            events[0],
            RelayEvent::Emit {
                topic: Topic::GeneralCopy,
                payload: Value::Null,
            }
        );
        assert!(queue.packets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_commands_are_forwarded() {
        let (router, mut rx, queue) = router();

        let outcome = router
            .handle_control(ControlCommand::new("solenoid", json!({"id": 3, "state": "open"})))
            .await
            .unwrap();
        assert_eq!(outcome, ControlOutcome::Forwarded { sequence: 0 });
        assert!(drain(&mut rx).is_empty());

        let packets = queue.packets.lock().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].priority(), Priority::Info);
        let log = &packets[0].logs()[0];
        assert_eq!(log.header, "solenoid");
        assert_eq!(log.message.to_value(), json!({"id": 3, "state": "open"}));
        assert_eq!(router.stats().forwarded, 1);
    }

    #[tokio::test]
    async fn forwarded_command_with_array_message_rejected() {
        let (router, mut rx, queue) = router();

        let err = router
            .handle_control(ControlCommand::new("throttle", json!([1, 2])))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::UnsupportedMessage { ref header, kind: "array" } if header == "throttle"
        ));

        assert!(queue.packets.lock().unwrap().is_empty());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(router.stats().forwarded, 0);
    }
}
