//! In-memory transport for tests
//!
//! `MockTransport::pair` returns the link plus a `MockPeer` that plays the
//! remote end: it injects inbound bytes, records every outbound write as a
//! separate chunk, and can force read or write failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::link::{ChunkPolicy, Transport, TransportReader, TransportWriter};

const MOCK_PEER: &str = "mock-peer";

#[derive(Default)]
struct Shared {
    written: Mutex<Vec<Bytes>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    closed: AtomicBool,
}

/// In-memory link
pub struct MockTransport {
    inbound: mpsc::UnboundedReceiver<Bytes>,
    shared: Arc<Shared>,
    chunk_policy: ChunkPolicy,
    idle_timeout: Duration,
    read_size: usize,
}

impl MockTransport {
    /// Socket-like link: frames written whole
    pub fn pair() -> (Self, MockPeer) {
        Self::with_policy(ChunkPolicy::WHOLE)
    }

    /// Link with a given fragmentation rule (e.g. serial-like 60-byte chunks)
    pub fn with_policy(chunk_policy: ChunkPolicy) -> (Self, MockPeer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        (
            Self {
                inbound: rx,
                shared: Arc::clone(&shared),
                chunk_policy,
                idle_timeout: Duration::from_millis(5),
                read_size: 8192,
            },
            MockPeer {
                inbound: Some(tx),
                shared,
            },
        )
    }

    /// How long a read waits for data before returning empty
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

impl Transport for MockTransport {
    type Reader = MockReader;
    type Writer = MockWriter;

    fn kind(&self) -> &'static str {
        "mock"
    }

    fn read_size(&self) -> usize {
        self.read_size
    }

    fn chunk_policy(&self) -> ChunkPolicy {
        self.chunk_policy
    }

    fn split(self) -> (MockReader, MockWriter) {
        (
            MockReader {
                inbound: self.inbound,
                pending: BytesMut::new(),
                shared: Arc::clone(&self.shared),
                idle_timeout: self.idle_timeout,
            },
            MockWriter {
                shared: self.shared,
            },
        )
    }
}

pub struct MockReader {
    inbound: mpsc::UnboundedReceiver<Bytes>,
    pending: BytesMut,
    shared: Arc<Shared>,
    idle_timeout: Duration,
}

impl MockReader {
    fn drain_ready(&mut self) {
        while let Ok(bytes) = self.inbound.try_recv() {
            self.pending.extend_from_slice(&bytes);
        }
    }
}

impl TransportReader for MockReader {
    async fn read(&mut self, max_bytes: usize) -> Result<Bytes> {
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(TransportError::io(
                "read",
                MOCK_PEER,
                std::io::Error::other("injected read failure"),
            ));
        }

        if self.pending.is_empty() {
            match tokio::time::timeout(self.idle_timeout, self.inbound.recv()).await {
                Ok(Some(bytes)) => self.pending.extend_from_slice(&bytes),
                Ok(None) => return Err(TransportError::closed(MOCK_PEER)),
                Err(_) => return Ok(Bytes::new()),
            }
        }
        self.drain_ready();

        let n = self.pending.len().min(max_bytes);
        Ok(self.pending.split_to(n).freeze())
    }
}

pub struct MockWriter {
    shared: Arc<Shared>,
}

impl TransportWriter for MockWriter {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::io(
                "write",
                MOCK_PEER,
                std::io::Error::other("injected write failure"),
            ));
        }
        self.shared
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Bytes::copy_from_slice(data));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Remote end of a `MockTransport`
pub struct MockPeer {
    inbound: Option<mpsc::UnboundedSender<Bytes>>,
    shared: Arc<Shared>,
}

impl MockPeer {
    /// Deliver bytes to the relay's reader
    pub fn inject(&self, data: impl Into<Bytes>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(data.into());
        }
    }

    /// Hang up: the reader fails with `Closed` once buffered data is consumed
    pub fn disconnect(&mut self) {
        self.inbound = None;
    }

    /// Make every subsequent read fail
    pub fn fail_reads(&self) {
        self.shared.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self) {
        self.shared.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Every write received so far, one entry per chunk
    pub fn written_chunks(&self) -> Vec<Bytes> {
        self.shared
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All written bytes concatenated
    pub fn written_bytes(&self) -> Vec<u8> {
        self.written_chunks().concat()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` chunks were written or `timeout` elapses
    pub async fn wait_for_chunks(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.written_chunks().len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}
