//! Dispatch queue
//!
//! Outbound frames ordered by `(priority, sequence)`. The sequence number is
//! assigned under the same lock as the push, so equal-priority entries come
//! out in enqueue order. There is no aging: a steady stream of `Critical`
//! traffic starves everything below it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::{ContractError, OutboundQueue, Packet, Priority};
use ingestion::FrameCodec;
use tracing::trace;

/// One encoded frame waiting to be sent
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub priority: Priority,
    pub sequence: u64,
    /// Complete wire frame, delimiters included
    pub payload: Bytes,
}

impl QueueEntry {
    fn key(&self) -> (Priority, u64) {
        (self.priority, self.sequence)
    }
}

// Ordering ignores the payload; sequences are unique within a queue
impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    next_sequence: u64,
}

/// Unbounded min-heap of outbound frames, safe to share between tasks
#[derive(Debug, Default)]
pub struct DispatchQueue {
    inner: Mutex<Inner>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame and return its sequence number
    pub fn enqueue(&self, priority: Priority, payload: Bytes) -> u64 {
        let mut inner = self.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.heap.push(Reverse(QueueEntry {
            priority,
            sequence,
            payload,
        }));
        trace!(priority = priority.as_str(), sequence, depth = inner.heap.len(), "frame queued");
        sequence
    }

    /// Pop the most urgent, oldest entry without waiting
    pub fn dequeue_best(&self) -> Option<QueueEntry> {
        self.lock().heap.pop().map(|Reverse(entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Packet-level entry point to the dispatch queue
///
/// Encodes each packet into a wire frame, then queues it at the packet's
/// priority. Encoding errors surface to the caller and nothing is queued.
#[derive(Clone)]
pub struct Outbox {
    queue: Arc<DispatchQueue>,
    codec: FrameCodec,
}

impl Outbox {
    pub fn new(queue: Arc<DispatchQueue>, codec: FrameCodec) -> Self {
        Self { queue, codec }
    }

    pub fn queue(&self) -> &Arc<DispatchQueue> {
        &self.queue
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl OutboundQueue for Outbox {
    fn enqueue(&self, packet: Packet) -> Result<u64, ContractError> {
        let frame = self.codec.encode(&packet)?;
        let sequence = self.queue.enqueue(packet.priority(), frame);
        observability::record_queue_depth(self.queue.len());
        Ok(sequence)
    }
}
