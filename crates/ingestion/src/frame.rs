//! Wire frame encoding
//!
//! `DELIM_START || serialize(packet) || DELIM_END`, sent as one contiguous
//! byte run. There is no escaping layer: the serializer must never emit
//! either delimiter.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{ContractError, Packet, PacketCodec, ParseError};

use crate::codec::JsonPacketCodec;

/// Frame start delimiter
pub const DELIM_START: u8 = b'^';

/// Frame end delimiter
pub const DELIM_END: u8 = b'$';

/// Wrap an already serialized payload in frame delimiters
///
/// # Errors
/// `ContractError::ReservedDelimiter` if the payload contains either
/// delimiter byte
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, ContractError> {
    if let Some(offset) = payload
        .iter()
        .position(|b| *b == DELIM_START || *b == DELIM_END)
    {
        return Err(ContractError::ReservedDelimiter {
            byte: payload[offset],
            offset,
        });
    }

    let mut frame = BytesMut::with_capacity(payload.len() + 2);
    frame.put_u8(DELIM_START);
    frame.put_slice(payload);
    frame.put_u8(DELIM_END);
    Ok(frame.freeze())
}

/// Packet <-> frame conversion over a swappable `PacketCodec`
#[derive(Clone)]
pub struct FrameCodec {
    codec: Arc<dyn PacketCodec>,
}

impl FrameCodec {
    pub fn new(codec: Arc<dyn PacketCodec>) -> Self {
        Self { codec }
    }

    /// Frame codec over `JsonPacketCodec`
    pub fn json() -> Self {
        Self::new(Arc::new(JsonPacketCodec::new()))
    }

    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }

    /// Serialize and delimit a packet
    pub fn encode(&self, packet: &Packet) -> Result<Bytes, ContractError> {
        let payload = self.codec.serialize(packet)?;
        encode_frame(&payload)
    }

    /// Decode the content between two delimiters
    pub fn decode(&self, content: &[u8]) -> Result<Packet, ParseError> {
        self.codec.deserialize(content)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::json()
    }
}

impl std::fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("codec", &self.codec.name())
            .finish()
    }
}
