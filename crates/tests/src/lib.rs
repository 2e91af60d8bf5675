//! # Integration Tests
//!
//! Cross-crate end-to-end scenarios, driven through `MockTransport`.
//!
//! Covers:
//! - configuration examples loading into a runnable blueprint
//! - outbound ordering and fragmentation
//! - inbound tolerance of malformed and noisy input
//! - shutdown propagation on link failure
//! - operator commands and sink output

#[cfg(test)]
mod support {
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{Packet, SessionConfig};
    use ingestion::{FrameAssembler, FrameCodec};
    use transport::MockPeer;

    pub fn fast_config() -> SessionConfig {
        SessionConfig {
            send_interval_ms: 5,
            listen_interval_ms: 1,
            heartbeat_interval_ms: 3_600_000,
            ingest_timeout_ms: 20,
            ..SessionConfig::default()
        }
    }

    pub fn frame(packet: &Packet) -> Bytes {
        FrameCodec::json().encode(packet).unwrap()
    }

    /// Reassemble and decode everything the relay wrote
    pub fn decode_written(chunks: &[Bytes]) -> Vec<Packet> {
        let codec = FrameCodec::json();
        let mut assembler = FrameAssembler::new(64 * 1024);
        assembler
            .push(&chunks.concat())
            .iter()
            .map(|content| codec.decode(content).unwrap())
            .collect()
    }

    pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        condition()
    }

    pub async fn wait_for_text(peer: &MockPeer, needle: &str, timeout: Duration) -> bool {
        wait_until(timeout, || {
            String::from_utf8_lossy(&peer.written_bytes()).contains(needle)
        })
        .await
    }
}

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{SinkType, TransportSelection};

    #[test]
    fn documented_config_loads() {
        let toml = r#"
[transport]
use_serial = false

[transport.serial]
device = "/dev/ttyUSB0"
baud_rate = 57600
read_timeout_ms = 5
chunk_size = 60
chunk_delay_ms = 200

[transport.socket]
bind_addr = "0.0.0.0"
port = 5005
recv_buffer = 8192
read_timeout_ms = 50

[session]
send_interval_ms = 200
listen_interval_ms = 5
heartbeat_interval_ms = 3000
ingest_timeout_ms = 1000
send_enabled = true
ingest_queue_capacity = 1024
max_reassembly_bytes = 65536

[[sinks]]
name = "console"
sink_type = "log"
queue_capacity = 100
params = {}
"#;

        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert!(matches!(
            blueprint.transport.selection().unwrap(),
            TransportSelection::Socket(socket) if socket.port == 5005
        ));
        assert_eq!(blueprint.sinks[0].sink_type, SinkType::Log);

        // Serialized form loads back to the same settings
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reloaded.session.heartbeat_interval_ms, 3000);
        assert_eq!(reloaded.sinks.len(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use contracts::{
        Log, LogMessage, OutboundQueue, Packet, Priority, RelayEvent, SinkConfig, SinkType, Topic,
    };
    use dispatcher::{create_dispatcher, ControlCommand, ControlOutcome};
    use serde_json::json;
    use session::{LoopKind, Session, StopReason};
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use transport::{ChunkPolicy, MockTransport};

    use crate::support::{decode_written, fast_config, frame, wait_for_text, wait_until};

    const WAIT: Duration = Duration::from_secs(2);

    fn headers(packets: &[Packet]) -> Vec<String> {
        packets.iter().map(|p| p.logs()[0].header.clone()).collect()
    }

    #[tokio::test]
    async fn critical_sent_before_warning() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, _events_rx) = mpsc::channel(64);
        let session = Session::new(transport, fast_config(), events_tx);

        let outbox = session.outbox();
        outbox
            .enqueue(Packet::single(
                Log::new("stage", "ignition", 1.0),
                Priority::Warning,
            ))
            .unwrap();
        outbox
            .enqueue(Packet::single(
                Log::new(
                    "valve_data",
                    LogMessage::from_value(json!({"v1": "open"})).unwrap(),
                    1.1,
                ),
                Priority::Critical,
            ))
            .unwrap();

        let running = session.begin();
        assert!(peer.wait_for_chunks(3, WAIT).await);
        running.shutdown().await;

        let packets = decode_written(&peer.written_chunks());
        assert_eq!(
            headers(&packets[..3]),
            vec!["valve_data", "stage", "heartbeat"]
        );
        assert_eq!(packets[0].priority(), Priority::Critical);
    }

    #[tokio::test]
    async fn equal_priority_sent_in_enqueue_order() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, _events_rx) = mpsc::channel(64);
        let session = Session::new(transport, fast_config(), events_tx);

        let outbox = session.outbox();
        for (i, tag) in ["A", "B", "C"].into_iter().enumerate() {
            outbox
                .enqueue(Packet::single(
                    Log::new("stage", tag, i as f64),
                    Priority::Info,
                ))
                .unwrap();
        }

        let running = session.begin();
        assert!(peer.wait_for_chunks(4, WAIT).await);
        running.shutdown().await;

        let packets = decode_written(&peer.written_chunks());
        let messages: Vec<_> = packets[..3]
            .iter()
            .map(|p| p.logs()[0].message.to_value())
            .collect();
        assert_eq!(messages, vec![json!("A"), json!("B"), json!("C")]);
        // The heartbeat was queued after them at the same priority
        assert_eq!(packets[3].logs()[0].header, "heartbeat");
    }

    #[tokio::test]
    async fn fragmented_frame_reassembles_on_the_far_side() {
        let padding = frame(&Packet::single(Log::new("stage", "", 1.0), Priority::Warning)).len();
        let packet = Packet::single(
            Log::new("stage", "x".repeat(200 - padding), 1.0),
            Priority::Warning,
        );
        assert_eq!(frame(&packet).len(), 200);

        // Radio side: 60-byte chunks
        let policy = ChunkPolicy::new(60, Duration::from_millis(1));
        let (transport, radio) = MockTransport::with_policy(policy);
        let (events_tx, _events_rx) = mpsc::channel(64);
        let sender_side = Session::new(transport, fast_config(), events_tx);
        sender_side.outbox().enqueue(packet.clone()).unwrap();
        let running = sender_side.begin();

        assert!(radio.wait_for_chunks(4, WAIT).await);
        running.shutdown().await;

        let chunks: Vec<_> = radio.written_chunks().into_iter().take(4).collect();
        let sizes: Vec<_> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![60, 60, 60, 20]);

        // Ground side: the same chunks arrive as separate reads
        let (transport, ground) = MockTransport::pair();
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let running = Session::new(transport, fast_config(), events_tx).begin();
        for chunk in chunks {
            ground.inject(chunk);
            tokio::time::sleep(Duration::from_millis(3)).await;
        }

        let saved = loop {
            let event = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
            if let RelayEvent::Save { log } = event {
                break log;
            }
        };
        assert_eq!(saved, packet.logs()[0]);

        let report = running.shutdown().await;
        assert_eq!(report.frames_received, 1);
        assert_eq!(report.frames_decoded, 1);
        assert_eq!(report.parse_errors, 0);
    }

    #[tokio::test]
    async fn malformed_frame_does_not_stop_ingestion() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let running = Session::new(transport, fast_config(), events_tx).begin();

        peer.inject(&b"^this is not a packet$"[..]);
        peer.inject(frame(&Packet::single(
            Log::new("valve_data", "v2 closed", 3.0),
            Priority::Info,
        )));

        let event = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
        assert!(matches!(
            event,
            RelayEvent::Emit {
                topic: Topic::ValveData,
                ..
            }
        ));
        assert!(running.is_running());

        let report = running.shutdown().await;
        assert_eq!(report.stop_reason, Some(StopReason::Requested));
        assert_eq!(report.frames_received, 2);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(report.frames_decoded, 1);
    }

    #[tokio::test]
    async fn leading_garbage_is_skipped() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let running = Session::new(transport, fast_config(), events_tx).begin();

        let noise = b"\x07\xffnoise$ before start";
        let mut bytes = noise.to_vec();
        bytes.extend_from_slice(&frame(&Packet::single(
            Log::new("stage", "liftoff", 4.0),
            Priority::Info,
        )));
        peer.inject(bytes);

        let event = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
        assert_eq!(
            event,
            RelayEvent::Emit {
                topic: Topic::General,
                payload: Log::new("stage", "liftoff", 4.0).to_value(),
            }
        );

        let report = running.shutdown().await;
        assert_eq!(report.parse_errors, 0);
        assert_eq!(report.frames_decoded, 1);
        assert!(report.bytes_discarded >= noise.len() as u64);
    }

    #[tokio::test]
    async fn read_failure_stops_every_loop() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, _events_rx) = mpsc::channel(64);
        let running = Session::new(transport, fast_config(), events_tx).begin();
        let state = running.state();

        assert!(peer.wait_for_chunks(1, WAIT).await);
        peer.fail_reads();

        let report = timeout(WAIT, running.wait()).await.unwrap();
        assert!(!state.is_running());
        assert!(report.failed());
        assert!(matches!(
            report.stop_reason,
            Some(StopReason::TransportFailed {
                stage: LoopKind::Listener,
                ..
            })
        ));
        // The sender closed its half on the way out
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn peer_hangup_stops_the_session() {
        let (transport, mut peer) = MockTransport::pair();
        let (events_tx, _events_rx) = mpsc::channel(64);
        let running = Session::new(transport, fast_config(), events_tx).begin();

        peer.disconnect();

        let report = timeout(WAIT, running.wait()).await.unwrap();
        assert!(matches!(
            report.stop_reason,
            Some(StopReason::TransportFailed {
                stage: LoopKind::Listener,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn write_failure_stops_the_session() {
        let (transport, peer) = MockTransport::pair();
        peer.fail_writes();
        let (events_tx, _events_rx) = mpsc::channel(64);
        let running = Session::new(transport, fast_config(), events_tx).begin();

        let report = timeout(WAIT, running.wait()).await.unwrap();
        assert!(matches!(
            report.stop_reason,
            Some(StopReason::TransportFailed {
                stage: LoopKind::Sender,
                ..
            })
        ));
        assert_eq!(report.frames_sent, 0);
    }

    #[tokio::test]
    async fn operator_command_reaches_the_device() {
        let (transport, peer) = MockTransport::pair();
        let (events_tx, _events_rx) = mpsc::channel(64);
        let running = Session::new(transport, fast_config(), events_tx).begin();

        let outcome = running
            .router()
            .handle_control(ControlCommand::new(
                "solenoid",
                json!({"id": 3, "state": "open"}),
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, ControlOutcome::Forwarded { .. }));

        assert!(wait_for_text(&peer, "solenoid", WAIT).await);
        let report = running.shutdown().await;
        assert_eq!(report.router.forwarded, 1);

        let packets = decode_written(&peer.written_chunks());
        let forwarded = packets
            .iter()
            .find(|p| p.logs()[0].header == "solenoid")
            .unwrap();
        assert_eq!(forwarded.priority(), Priority::Info);
        assert_eq!(
            forwarded.logs()[0].message.to_value(),
            json!({"id": 3, "state": "open"})
        );
    }

    #[tokio::test]
    async fn inbound_logs_land_in_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SinkConfig {
            name: "black_box".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 64,
            params: HashMap::from([(
                "base_path".to_string(),
                dir.path().display().to_string(),
            )]),
        };

        let (events_tx, events_rx) = mpsc::channel(64);
        let dispatcher = create_dispatcher(vec![sink], events_rx).await.unwrap();
        let dispatcher_task = dispatcher.spawn();

        let (transport, peer) = MockTransport::pair();
        let running = Session::new(transport, fast_config(), events_tx).begin();

        peer.inject(frame(&Packet::single(
            Log::new("stage", "ignition", 1.0),
            Priority::Info,
        )));
        peer.inject(frame(&Packet::single(
            Log::new(
                "sensor_data",
                LogMessage::from_value(json!({"pressure": {"tank": {"psi": 812.5}}})).unwrap(),
                1.5,
            ),
            Priority::Info,
        )));

        let router = running.router();
        assert!(wait_until(WAIT, || router.stats().routed == 2).await);
        drop(router);

        let report = running.shutdown().await;
        assert_eq!(report.logs_routed, 2);

        // Every router clone is gone, so the dispatcher drains and exits
        let sinks = timeout(WAIT, dispatcher_task).await.unwrap().unwrap();
        assert_eq!(sinks.len(), 1);
        // emit + save, then put + emit + save
        assert_eq!(sinks[0].1.write_count, 5);

        let black_box =
            std::fs::read_to_string(dir.path().join(dispatcher::sinks::BLACK_BOX_FILE))
                .unwrap();
        assert_eq!(black_box.lines().count(), 2);
        assert!(black_box.contains("ignition"));

        let sensors =
            std::fs::read_to_string(dir.path().join(dispatcher::sinks::SENSOR_FILE))
                .unwrap();
        assert_eq!(sensors.lines().count(), 1);
        assert!(sensors.contains("812.5"));
    }
}
