//! # Ingestion
//!
//! Wire framing and inbound reassembly.
//!
//! Responsibilities:
//! - Encode a `Packet` into a `^ ... $` delimited frame
//! - Reassemble complete frames from a fragmented byte stream
//! - Provide the default JSON serialization collaborator
//! - Hand extracted frames to the ingest stage through a bounded queue
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{FrameAssembler, FrameCodec, IngestQueue};
//!
//! let codec = FrameCodec::json();
//! let queue = IngestQueue::new(1024);
//! let mut assembler = FrameAssembler::new(64 * 1024);
//!
//! for frame in assembler.push(&bytes_from_link) {
//!     queue.sender().submit(frame).await?;
//! }
//! let packet = codec.decode(&queue.receiver().recv().await?)?;
//! ```

mod assembler;
mod codec;
mod config;
mod error;
mod frame;
mod queue;

// Re-exports
pub use assembler::FrameAssembler;
pub use codec::JsonPacketCodec;
pub use config::{IngestionMetrics, MetricsSnapshot, DEFAULT_MAX_BUFFER};
pub use error::{IngestionError, Result};
pub use frame::{encode_frame, FrameCodec, DELIM_END, DELIM_START};
pub use queue::{IngestQueue, IngestReceiver, IngestSender};
