//! TOML-based VTN configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fleet::RegistrySettings;

/// Top-level VTN configuration parsed from TOML.
///
/// All fields have defaults. Load from TOML with
/// [`VtnConfig::from_toml_file`] or start from [`VtnConfig::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VtnConfig {
    /// Identity and listening address.
    #[serde(default)]
    pub server: ServerConfig,
    /// Fleet registry storage and liveness parameters.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Event dispatch parameters.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Identity and listening address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Identifier this VTN presents to VENs.
    pub vtn_id: String,
    /// Bind address for the administrative API.
    pub bind: String,
    /// Port for the administrative API.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            vtn_id: "vtn".to_string(),
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Fleet registry storage and liveness parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Directory holding `vens.json`.
    pub data_dir: PathBuf,
    /// Expected seconds between VEN check-ins (must be > 0).
    pub expected_check_in_secs: u64,
    /// Timeout for one registry save or load, in milliseconds (must be > 0).
    pub io_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("registered_vens"),
            expected_check_in_secs: 10,
            io_timeout_ms: 5_000,
        }
    }
}

impl RegistryConfig {
    /// Registry tunables derived from this section.
    pub fn settings(&self) -> RegistrySettings {
        RegistrySettings {
            expected_check_in: Duration::from_secs(self.expected_check_in_secs),
            io_timeout: Duration::from_millis(self.io_timeout_ms),
        }
    }
}

/// Event dispatch parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Timeout for one dispatch or cancel call, in milliseconds (must be > 0).
    pub timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"registry.io_timeout_ms"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl VtnConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.vtn_id.trim().is_empty() {
            errors.push(ConfigError {
                field: "server.vtn_id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.registry.expected_check_in_secs == 0 {
            errors.push(ConfigError {
                field: "registry.expected_check_in_secs".into(),
                message: "must be > 0".into(),
            });
        }
        if self.registry.io_timeout_ms == 0 {
            errors.push(ConfigError {
                field: "registry.io_timeout_ms".into(),
                message: "must be > 0".into(),
            });
        }
        if self.dispatch.timeout_ms == 0 {
            errors.push(ConfigError {
                field: "dispatch.timeout_ms".into(),
                message: "must be > 0".into(),
            });
        }

        errors
    }
}
