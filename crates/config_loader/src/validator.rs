//! Configuration validation
//!
//! Rules:
//! - the transport selected by `use_serial` has its settings table
//! - serial baud rate and chunk size are non-zero
//! - socket receive buffer is non-zero and fits in the reassembly limit
//! - every session interval and capacity is non-zero
//! - sink names are non-empty and unique
//! - network sinks carry a parseable `addr`

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, RelayBlueprint, SinkType, TransportSelection};

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_transport(blueprint)?;
    validate_session(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Validate the selected transport
fn validate_transport(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    match blueprint.transport.selection()? {
        TransportSelection::Serial(serial) => {
            if serial.device.is_empty() {
                return Err(ContractError::config_validation(
                    "transport.serial.device",
                    "device path cannot be empty",
                ));
            }
            if serial.baud_rate == 0 {
                return Err(ContractError::config_validation(
                    "transport.serial.baud_rate",
                    "baud_rate must be > 0",
                ));
            }
            if serial.chunk_size == 0 {
                return Err(ContractError::config_validation(
                    "transport.serial.chunk_size",
                    "chunk_size must be > 0",
                ));
            }
        }
        TransportSelection::Socket(socket) => {
            if socket.recv_buffer == 0 {
                return Err(ContractError::config_validation(
                    "transport.socket.recv_buffer",
                    "recv_buffer must be > 0",
                ));
            }
            if socket.recv_buffer > blueprint.session.max_reassembly_bytes {
                return Err(ContractError::config_validation(
                    "session.max_reassembly_bytes",
                    format!(
                        "max_reassembly_bytes ({}) must be >= transport.socket.recv_buffer ({})",
                        blueprint.session.max_reassembly_bytes, socket.recv_buffer
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Validate session timing and limits
fn validate_session(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let session = &blueprint.session;

    let intervals = [
        ("session.send_interval_ms", session.send_interval_ms),
        ("session.listen_interval_ms", session.listen_interval_ms),
        ("session.heartbeat_interval_ms", session.heartbeat_interval_ms),
        ("session.ingest_timeout_ms", session.ingest_timeout_ms),
    ];
    for (field, value) in intervals {
        if value == 0 {
            return Err(ContractError::config_validation(field, "interval must be > 0"));
        }
    }

    if session.ingest_queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "session.ingest_queue_capacity",
            "ingest_queue_capacity must be > 0",
        ));
    }
    if session.max_reassembly_bytes == 0 {
        return Err(ContractError::config_validation(
            "session.max_reassembly_bytes",
            "max_reassembly_bytes must be > 0",
        ));
    }

    Ok(())
}

/// Validate sink configuration
fn validate_sinks(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::Network {
            let addr = sink.params.get("addr").ok_or_else(|| {
                ContractError::config_validation(
                    format!("sinks[{}].params.addr", sink.name),
                    "network sink requires an 'addr' parameter",
                )
            })?;
            addr.parse::<SocketAddr>().map_err(|e| {
                ContractError::config_validation(
                    format!("sinks[{}].params.addr", sink.name),
                    format!("invalid address '{addr}': {e}"),
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SerialConfig, SinkConfig};
    use std::collections::HashMap;

    fn minimal_blueprint() -> RelayBlueprint {
        let mut bp = RelayBlueprint::socket("127.0.0.1", 5005);
        bp.sinks.push(SinkConfig {
            name: "log".into(),
            sink_type: SinkType::Log,
            queue_capacity: 100,
            params: HashMap::new(),
        });
        bp
    }

    fn serial_config() -> SerialConfig {
        SerialConfig {
            device: "/dev/ttyUSB0".into(),
            baud_rate: 57600,
            read_timeout_ms: 5,
            chunk_size: 60,
            chunk_delay_ms: 200,
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_missing_selected_transport() {
        let mut bp = minimal_blueprint();
        bp.transport.use_serial = true;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("transport.serial"), "got: {err}");
    }

    #[test]
    fn test_unselected_transport_ignored() {
        let mut bp = minimal_blueprint();
        let mut serial = serial_config();
        serial.baud_rate = 0;
        bp.transport.serial = Some(serial);
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_baud_rate() {
        let mut bp = minimal_blueprint();
        let mut serial = serial_config();
        serial.baud_rate = 0;
        bp.transport.use_serial = true;
        bp.transport.serial = Some(serial);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("baud_rate must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_chunk_size() {
        let mut bp = minimal_blueprint();
        let mut serial = serial_config();
        serial.chunk_size = 0;
        bp.transport.use_serial = true;
        bp.transport.serial = Some(serial);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("chunk_size"), "got: {err}");
    }

    #[test]
    fn test_reassembly_smaller_than_recv_buffer() {
        let mut bp = minimal_blueprint();
        bp.session.max_reassembly_bytes = 1024;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("max_reassembly_bytes"), "got: {err}");
    }

    #[test]
    fn test_zero_interval() {
        let mut bp = minimal_blueprint();
        bp.session.heartbeat_interval_ms = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("heartbeat_interval_ms"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(bp.sinks[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate sink name"), "got: {err}");
    }

    #[test]
    fn test_network_sink_requires_addr() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(SinkConfig {
            name: "ui".into(),
            sink_type: SinkType::Network,
            queue_capacity: 10,
            params: HashMap::new(),
        });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("addr"), "got: {err}");

        bp.sinks[1]
            .params
            .insert("addr".into(), "not-an-address".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("invalid address"), "got: {err}");

        bp.sinks[1]
            .params
            .insert("addr".into(), "127.0.0.1:9100".into());
        assert!(validate(&bp).is_ok());
    }
}
