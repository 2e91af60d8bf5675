//! Session lifecycle
//!
//! `Session` (idle) -> `begin` -> `RunningSession` -> `wait`/`shutdown` ->
//! `SessionReport`. Sessions are single use.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use contracts::{RelayBlueprint, RelayEvent, SessionClock, SessionConfig};
use dispatcher::LogRouter;
use ingestion::{FrameAssembler, FrameCodec, IngestQueue, IngestionMetrics};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use transport::{RelayTransport, Transport};

use crate::error::SessionError;
use crate::heartbeat::Heartbeat;
use crate::ingest::Ingest;
use crate::listener::Listener;
use crate::queue::{DispatchQueue, Outbox};
use crate::sender::Sender;
use crate::state::{LoopKind, RunState, StopReason};
use crate::stats::{SessionReport, SessionStats};

/// A session whose loops have not started yet
pub struct Session<T> {
    transport: T,
    config: SessionConfig,
    codec: FrameCodec,
    queue: Arc<DispatchQueue>,
    outbox: Outbox,
    router: LogRouter<Outbox>,
    clock: SessionClock,
}

impl Session<RelayTransport> {
    /// Establish the configured link and prepare a session on it
    ///
    /// Blocks until the serial device opens or a socket peer connects.
    #[instrument(name = "session_connect", skip_all, fields(serial = blueprint.transport.use_serial))]
    pub async fn connect(
        blueprint: &RelayBlueprint,
        events: mpsc::Sender<RelayEvent>,
    ) -> Result<Self, SessionError> {
        let transport = RelayTransport::connect(&blueprint.transport).await?;
        Ok(Self::new(transport, blueprint.session.clone(), events))
    }
}

impl<T: Transport> Session<T> {
    /// Prepare a session using the JSON packet codec
    pub fn new(transport: T, config: SessionConfig, events: mpsc::Sender<RelayEvent>) -> Self {
        Self::with_codec(transport, config, events, FrameCodec::json())
    }

    pub fn with_codec(
        transport: T,
        config: SessionConfig,
        events: mpsc::Sender<RelayEvent>,
        codec: FrameCodec,
    ) -> Self {
        let clock = SessionClock::start();
        let queue = Arc::new(DispatchQueue::new());
        let outbox = Outbox::new(Arc::clone(&queue), codec.clone());
        let router = LogRouter::new(events, Arc::new(outbox.clone()), clock);

        Self {
            transport,
            config,
            codec,
            queue,
            outbox,
            router,
            clock,
        }
    }

    /// Packet entry point for application code
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Router handle for inbound control commands
    pub fn router(&self) -> LogRouter<Outbox> {
        self.router.clone()
    }

    pub fn clock(&self) -> SessionClock {
        self.clock
    }

    /// Start the four loops
    #[instrument(name = "session_begin", skip(self), fields(link = self.transport.kind()))]
    pub fn begin(self) -> RunningSession {
        let state = RunState::new();
        let stats = Arc::new(SessionStats::new());
        let metrics = Arc::new(IngestionMetrics::new());

        let link = self.transport.kind();
        let read_size = self.transport.read_size();
        let policy = self.transport.chunk_policy();
        let (reader, writer) = self.transport.split();

        let ingest_queue =
            IngestQueue::with_metrics(self.config.ingest_queue_capacity, Arc::clone(&metrics));

        let listener = Listener {
            reader,
            read_size,
            assembler: FrameAssembler::with_metrics(
                self.config.max_reassembly_bytes,
                Arc::clone(&metrics),
            ),
            ingest: ingest_queue.sender(),
            idle_interval: self.config.listen_interval(),
            state: state.clone(),
        };
        let sender = Sender {
            writer,
            queue: Arc::clone(&self.queue),
            policy,
            period: self.config.send_interval(),
            enabled: self.config.send_enabled,
            state: state.clone(),
            stats: Arc::clone(&stats),
        };
        let heartbeat = Heartbeat {
            outbox: self.outbox.clone(),
            clock: self.clock,
            period: self.config.heartbeat_interval(),
            state: state.clone(),
            stats: Arc::clone(&stats),
        };
        let ingest = Ingest {
            frames: ingest_queue.receiver(),
            codec: self.codec.clone(),
            router: self.router.clone(),
            wait: self.config.ingest_timeout(),
            state: state.clone(),
            metrics: Arc::clone(&metrics),
            stats: Arc::clone(&stats),
        };

        let tasks = vec![
            spawn_loop(LoopKind::Listener, &state, listener.run()),
            spawn_loop(LoopKind::Sender, &state, sender.run()),
            spawn_loop(LoopKind::Heartbeat, &state, heartbeat.run()),
            spawn_loop(LoopKind::Ingest, &state, ingest.run()),
        ];

        info!(
            link,
            read_size,
            max_chunk = policy.max_chunk,
            chunk_delay_ms = policy.delay.as_millis() as u64,
            "session started"
        );

        RunningSession {
            state,
            tasks,
            stats,
            metrics,
            queue: self.queue,
            outbox: self.outbox,
            router: self.router,
            started: Instant::now(),
        }
    }
}

/// Stops the session if a loop ends while it is still running (panic)
struct LoopGuard {
    stage: LoopKind,
    state: RunState,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        if self.state.is_running() {
            self.state.stop(StopReason::Aborted {
                stage: self.stage,
                message: "loop exited while the session was running".to_string(),
            });
        }
    }
}

fn spawn_loop<F>(stage: LoopKind, state: &RunState, task: F) -> (LoopKind, JoinHandle<()>)
where
    F: Future<Output = ()> + Send + 'static,
{
    let guard = LoopGuard {
        stage,
        state: state.clone(),
    };
    let handle = tokio::spawn(async move {
        let _guard = guard;
        task.await;
    });
    (stage, handle)
}

/// A session with its loops running
pub struct RunningSession {
    state: RunState,
    tasks: Vec<(LoopKind, JoinHandle<()>)>,
    stats: Arc<SessionStats>,
    metrics: Arc<IngestionMetrics>,
    queue: Arc<DispatchQueue>,
    outbox: Outbox,
    router: LogRouter<Outbox>,
    started: Instant,
}

impl RunningSession {
    pub fn state(&self) -> RunState {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub fn router(&self) -> LogRouter<Outbox> {
        self.router.clone()
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Ask every loop to exit
    pub fn stop(&self) {
        if self.state.stop(StopReason::Requested) {
            info!("session stop requested");
        }
    }

    /// Wait until the session stops and every loop has exited, then report
    #[instrument(name = "session_wait", skip(self))]
    pub async fn wait(self) -> SessionReport {
        self.state.stopped().await;

        for (stage, task) in self.tasks {
            if let Err(e) = task.await {
                error!(%stage, error = %e, "session loop aborted");
            }
        }

        let unsent = self.queue.len();
        if unsent > 0 {
            warn!(unsent, "session ended with frames still queued");
        }

        let report = SessionReport::collect(
            self.started.elapsed(),
            self.state.stop_reason().cloned(),
            &self.stats,
            self.metrics.snapshot(),
            self.router.stats(),
            unsent,
        );
        info!(
            duration_secs = report.duration.as_secs_f64(),
            reason = ?report.stop_reason,
            "session finished"
        );
        report
    }

    /// Stop and wait
    pub async fn shutdown(self) -> SessionReport {
        self.stop();
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Log, OutboundQueue, Packet, Priority, Topic};
    use std::time::Duration;
    use transport::{ChunkPolicy, MockTransport};

    fn fast_config() -> SessionConfig {
        SessionConfig {
            send_interval_ms: 5,
            listen_interval_ms: 1,
            heartbeat_interval_ms: 3_600_000,
            ingest_timeout_ms: 20,
            ..SessionConfig::default()
        }
    }

    fn frame_for(log: Log) -> bytes::Bytes {
        FrameCodec::json()
            .encode(&Packet::single(log, Priority::Info))
            .unwrap()
    }

    #[tokio::test]
    async fn heartbeat_goes_out_first() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let running = Session::new(transport, fast_config(), events_tx).begin();

        assert!(peer.wait_for_chunks(1, Duration::from_secs(2)).await);
        let written = peer.written_bytes();
        let text = String::from_utf8_lossy(&written);
        assert!(text.starts_with('^'), "got: {text}");
        assert!(text.contains("AT - 0"), "got: {text}");

        let report = running.shutdown().await;
        assert_eq!(report.stop_reason, Some(StopReason::Requested));
        assert!(report.heartbeats >= 1);
        assert!(report.frames_sent >= 1);
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn inbound_frames_reach_router() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let running = Session::new(transport, fast_config(), events_tx).begin();

        peer.inject(frame_for(Log::new("valve_data", "v1 open", 2.0)));

        let first = tokio::time::timeout(Duration::from_secs(2), events_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            first,
            RelayEvent::Emit {
                topic: Topic::ValveData,
                ..
            }
        ));

        let report = running.shutdown().await;
        assert_eq!(report.frames_received, 1);
        assert_eq!(report.frames_decoded, 1);
        assert_eq!(report.logs_routed, 1);
    }

    #[tokio::test]
    async fn serial_policy_chunks_outbound_frames() {
        let policy = ChunkPolicy::new(60, Duration::from_millis(1));
        let (transport, peer) = MockTransport::with_policy(policy);
        let (events_tx, _events_rx) = mpsc::channel(16);
        let session = Session::new(transport, fast_config(), events_tx);

        // Queued before the loops start, and more urgent than the heartbeat
        let log = Log::new("stage", "x".repeat(300), 1.0);
        let frame = frame_for(log.clone());
        session
            .outbox()
            .enqueue(Packet::single(log, Priority::Warning))
            .unwrap();
        let running = session.begin();

        let expected = frame.len().div_ceil(60);
        assert!(peer.wait_for_chunks(expected, Duration::from_secs(2)).await);
        let chunks = peer.written_chunks();
        assert!(chunks[..expected].iter().all(|c| c.len() <= 60));

        // Only the priority differs from the Info frame built above
        let sent = chunks[..expected].concat();
        assert_eq!(sent.len(), frame.len() + "warning".len() - "info".len());
        assert_eq!(sent.first(), Some(&b'^'));
        assert_eq!(sent.last(), Some(&b'$'));

        running.shutdown().await;
    }

    #[tokio::test]
    async fn disabled_sender_leaves_frames_queued() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let config = SessionConfig {
            send_enabled: false,
            ..fast_config()
        };
        let running = Session::new(transport, config, events_tx).begin();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let report = running.shutdown().await;
        assert!(peer.written_chunks().is_empty());
        assert_eq!(report.frames_sent, 0);
        assert_eq!(report.unsent, 1);
    }
}
