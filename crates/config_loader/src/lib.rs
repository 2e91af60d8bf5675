//! Relay configuration
//!
//! Reads a `RelayBlueprint` (link selection, session timing, sinks) from a
//! TOML or JSON file and rejects it before any device is opened if the link
//! or a sink is unusable. The CLI reuses [`ConfigLoader::validate`] after
//! applying its flag overrides.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), contracts::ContractError> {
//! let blueprint = ConfigLoader::load_from_path(Path::new("relay.toml"))?;
//! println!("serial: {}", blueprint.transport.use_serial);
//! # Ok(())
//! # }
//! ```

mod parser;
mod validator;

pub use contracts::RelayBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry point for loading relay configs
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a relay config, picking the format from the extension
    ///
    /// # Errors
    /// `ConfigParse` for an unknown extension or malformed content,
    /// `ConfigValidation` when the link or a sink is unusable, `Io` when the
    /// file cannot be read
    pub fn load_from_path(path: &Path) -> Result<RelayBlueprint, ContractError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load and validate a relay config held in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RelayBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Check a blueprint that was edited after loading
    pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Render a blueprint as TOML, e.g. to print the effective config
    pub fn to_toml(blueprint: &RelayBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot render relay config as TOML: {e}")))
    }

    pub fn to_json(blueprint: &RelayBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot render relay config as JSON: {e}")))
    }
}

fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
    let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
        ContractError::config_parse(format!(
            "relay config '{}' has no extension, expected .toml or .json",
            path.display()
        ))
    })?;

    ConfigFormat::from_extension(ext).ok_or_else(|| {
        ContractError::config_parse(format!(
            "relay config '{}' has unsupported extension .{ext}",
            path.display()
        ))
    })
}
