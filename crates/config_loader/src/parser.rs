//! Blueprint deserialization
//!
//! Syntax only. Whether the link and sinks make sense is the validator's
//! job.

use contracts::{ContractError, RelayBlueprint};

/// Relay config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `relay.toml`, the format the CLI looks for by default
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Deserialize a blueprint without validating it
pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayBlueprint, ContractError> {
    let parsed: Result<RelayBlueprint, Box<dyn std::error::Error + Send + Sync>> = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(Into::into),
        ConfigFormat::Json => serde_json::from_str(content).map_err(Into::into),
    };

    parsed.map_err(|e| ContractError::ConfigParse {
        message: format!("relay config is not valid {}: {e}", format.label()),
        source: Some(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[transport]
use_serial = true

[transport.serial]
device = "/dev/ttyUSB0"
baud_rate = 9600
"#;
        let result = parse(content, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert!(bp.transport.use_serial);
        let serial = bp.transport.serial.unwrap();
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.chunk_size, 60);
        assert!(bp.sinks.is_empty());
        assert_eq!(bp.session.send_interval_ms, 200);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "transport": {
                "use_serial": false,
                "socket": { "bind_addr": "127.0.0.1", "port": 7000 }
            },
            "session": { "heartbeat_interval_ms": 500 },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let result = parse(content, ConfigFormat::Json);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.session.heartbeat_interval_ms, 500);
        assert_eq!(bp.session.ingest_timeout_ms, 1000);
        assert_eq!(bp.sinks[0].queue_capacity, 100);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse(content, ConfigFormat::Toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
        assert!(err.to_string().contains("not valid TOML"), "got: {err}");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
