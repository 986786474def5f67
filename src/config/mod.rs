//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path specified via the CLI argument
//! 2. Default location:
//!    - **Linux/macOS:** `~/.godot-check-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.godot-check-mcp\config.json`
//!
//! A missing file at the default location is not an error: the server runs
//! with built-in defaults (`gdlint`/`gdformat`/`godot` resolved via `PATH`).
//! An explicitly requested config file must exist.

mod settings;

pub use settings::{Config, ExportConfig, LoggingConfig, ToolsConfig};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.godot-check-mcp/`
/// - **Windows:** `%USERPROFILE%\.godot-check-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".godot-check-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location and
/// falls back to [`Config::default`] when no file exists there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Validation fails (empty binary name, zero timeout)
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            // No config anywhere: run on defaults.
            _ => return Ok(Config::default()),
        },
    };

    read_config_file(&config_path)
}

fn read_config_file(config_path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_dir_exists() {
        assert!(default_config_dir().is_some());
    }

    #[test]
    fn default_config_path_exists() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/config.json")));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn loads_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"logging": {"level": "debug"}}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.logging.level, "debug");
        // Untouched sections keep their defaults.
        assert_eq!(config.tools.gdlint_bin, "gdlint");
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
