//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use crate::error::ConfigError;
use serde::Deserialize;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// External tool binaries.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Export validation settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, bin) in [
            ("tools.gdlint_bin", &self.tools.gdlint_bin),
            ("tools.gdformat_bin", &self.tools.gdformat_bin),
            ("tools.godot_bin", &self.tools.godot_bin),
        ] {
            if bin.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        if self.export.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "export.timeout_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// External tool binary configuration.
///
/// Binaries are resolved through `PATH` unless an absolute path is given.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// The `gdlint` binary (gdtoolkit).
    #[serde(default = "default_gdlint_bin")]
    pub gdlint_bin: String,

    /// The `gdformat` binary (gdtoolkit).
    #[serde(default = "default_gdformat_bin")]
    pub gdformat_bin: String,

    /// The Godot editor binary used for headless export validation.
    #[serde(default = "default_godot_bin")]
    pub godot_bin: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gdlint_bin: default_gdlint_bin(),
            gdformat_bin: default_gdformat_bin(),
            godot_bin: default_godot_bin(),
        }
    }
}

fn default_gdlint_bin() -> String {
    "gdlint".to_string()
}

fn default_gdformat_bin() -> String {
    "gdformat".to_string()
}

fn default_godot_bin() -> String {
    "godot".to_string()
}

/// Export validation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Export preset used when the caller does not name one.
    #[serde(default = "default_preset")]
    pub default_preset: String,

    /// Upper bound on a single headless export run, in seconds.
    #[serde(default = "default_export_timeout")]
    pub timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_preset: default_preset(),
            timeout_secs: default_export_timeout(),
        }
    }
}

fn default_preset() -> String {
    "Web".to_string()
}

const fn default_export_timeout() -> u64 {
    120
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
