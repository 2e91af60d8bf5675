//! # Transport
//!
//! Duplex byte-stream link between the ground station and the vehicle.
//!
//! Responsibilities:
//! - Open the serial radio or accept the single TCP peer
//! - Split the link into an owned reader half and writer half
//! - Describe how outbound frames must be chunked (`ChunkPolicy`)
//! - Provide an in-memory `MockTransport` for tests
//!
//! There is no reconnect logic: any `TransportError` is fatal to the session.

pub mod error;
pub mod link;
pub mod mock;
pub mod relay;
pub mod serial;
pub mod socket;

pub use error::{Result, TransportError};
pub use link::{ChunkPolicy, Transport, TransportReader, TransportWriter};
pub use mock::{MockPeer, MockReader, MockTransport, MockWriter};
pub use relay::{RelayReader, RelayTransport, RelayWriter};
pub use serial::{SerialReader, SerialTransport, SerialWriter};
pub use socket::{SocketAcceptor, SocketReader, SocketTransport, SocketWriter};
