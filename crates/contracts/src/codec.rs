//! Serialization and outbound-queue contracts
//!
//! The byte encoding of a `Packet` is swappable; the core only relies on
//! these two traits.

use crate::{ContractError, Packet, ParseError};

/// Packet serialization contract
///
/// Implementations must never emit the frame delimiter bytes (`^`, `$`)
/// in serialized output: frames have no escaping layer.
pub trait PacketCodec: Send + Sync {
    /// Codec name (used for logging)
    fn name(&self) -> &str;

    /// Encode a packet into bytes
    fn serialize(&self, packet: &Packet) -> Result<Vec<u8>, ContractError>;

    /// Decode bytes into a packet
    ///
    /// # Errors
    /// `ParseError` on malformed input
    fn deserialize(&self, bytes: &[u8]) -> Result<Packet, ParseError>;
}

/// Outbound packet queue
///
/// Implemented by the session's priority dispatch queue; used by the
/// router to turn operator commands into downstream traffic.
pub trait OutboundQueue: Send + Sync {
    /// Enqueue a packet, returning the sequence number it was assigned
    fn enqueue(&self, packet: Packet) -> Result<u64, ContractError>;
}
