//! JSON packet codec
//!
//! Default serialization collaborator. JSON never uses `^` or `$` as
//! structural characters, so they can only occur inside string literals;
//! there they are rewritten as `\u005e` / `\u0024`, which every JSON parser
//! reads back as the original characters.

use contracts::{ContractError, Packet, PacketCodec, ParseError};

use crate::frame::{DELIM_END, DELIM_START};

const ESCAPED_START: &[u8] = br"\u005e";
const ESCAPED_END: &[u8] = br"\u0024";

/// JSON `PacketCodec` with delimiter-free output
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPacketCodec;

impl JsonPacketCodec {
    pub fn new() -> Self {
        Self
    }
}

impl PacketCodec for JsonPacketCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize(&self, packet: &Packet) -> Result<Vec<u8>, ContractError> {
        let raw = serde_json::to_vec(packet).map_err(|e| ContractError::encode(e.to_string()))?;
        Ok(escape_delimiters(raw))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Packet, ParseError> {
        serde_json::from_slice(bytes).map_err(|e| ParseError::with_source("invalid JSON packet", e))
    }
}

fn escape_delimiters(raw: Vec<u8>) -> Vec<u8> {
    if !raw.iter().any(|b| *b == DELIM_START || *b == DELIM_END) {
        return raw;
    }
    let mut out = Vec::with_capacity(raw.len() + 16);
    for byte in raw {
        match byte {
            DELIM_START => out.extend_from_slice(ESCAPED_START),
            DELIM_END => out.extend_from_slice(ESCAPED_END),
            other => out.push(other),
        }
    }
    out
}
