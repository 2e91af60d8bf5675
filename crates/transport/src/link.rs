//! Transport abstraction
//!
//! A link is established once, then split into a reader half owned by the
//! Listener and a writer half owned by the Sender.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Inbound half of a link
pub trait TransportReader: Send {
    /// Read up to `max_bytes`
    ///
    /// Returns an empty buffer when no data arrived within the link's own
    /// read timeout.
    ///
    /// # Errors
    /// `TransportError` on hard failure (device lost, peer closed)
    fn read(&mut self, max_bytes: usize) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Outbound half of a link
pub trait TransportWriter: Send {
    /// Write one chunk in full
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Release the link
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// An established duplex link
pub trait Transport: Send {
    type Reader: TransportReader + 'static;
    type Writer: TransportWriter + 'static;

    /// Short label used in logs ("serial", "socket", "mock")
    fn kind(&self) -> &'static str;

    /// Preferred read size for this link
    fn read_size(&self) -> usize;

    /// How outbound frames must be fragmented on this link
    fn chunk_policy(&self) -> ChunkPolicy;

    /// Split into independently owned halves
    fn split(self) -> (Self::Reader, Self::Writer);
}

/// Outbound fragmentation rule
///
/// The radio link cannot accept arbitrarily large bursts, so frames are cut
/// into `max_chunk` pieces with `delay` between consecutive pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub max_chunk: usize,
    pub delay: Duration,
}

impl ChunkPolicy {
    /// Frames are written in one piece
    pub const WHOLE: ChunkPolicy = ChunkPolicy {
        max_chunk: usize::MAX,
        delay: Duration::ZERO,
    };

    pub fn new(max_chunk: usize, delay: Duration) -> Self {
        Self {
            max_chunk: max_chunk.max(1),
            delay,
        }
    }

    /// Split a frame according to this policy
    pub fn chunks<'a>(&self, frame: &'a [u8]) -> std::slice::Chunks<'a, u8> {
        frame.chunks(self.max_chunk)
    }

    /// Number of writes a frame of `len` bytes needs
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.max_chunk)
    }

    pub fn is_whole(&self) -> bool {
        self.max_chunk == usize::MAX
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self::WHOLE
    }
}
