//! Configuration loading and write-back
//!
//! Bootstrap configuration lives in a small TOML file. Every field is optional:
//! a missing file is not an error, it just means compiled defaults apply.
//!
//! # Resolution
//!
//! Callers layer their own priority on top of [`TomlConfig`]:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default HTTP request timeout for collaborator calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the songbook REST API (e.g. `http://localhost:3001/api`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Bearer token sent with every API request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Request timeout, falling back to [`DEFAULT_REQUEST_TIMEOUT_SECS`]
    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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
    "info".to_string()
}

/// Get the platform default config file path
///
/// `~/.config/songbook/import.toml` on Linux, the platform config directory
/// elsewhere. Returns `None` when no config directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("songbook").join("import.toml"))
}

/// Load TOML configuration with graceful degradation
///
/// A missing file yields defaults. An unreadable or malformed file is a
/// configuration error. Callers that load before installing a subscriber
/// report the missing file themselves.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write TOML configuration atomically (temp file + rename)
///
/// Creates parent directories as needed. On Unix the file is restricted to
/// mode 0600 because it may hold an API token.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_default() {
        let config = TomlConfig::default();
        assert_eq!(config.request_timeout_secs(), DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_request_timeout_zero_falls_back() {
        let config = TomlConfig {
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.request_timeout_secs(), DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: TomlConfig = toml::from_str("api_url = \"http://example.test/api\"").unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://example.test/api"));
        assert_eq!(config.logging.level, "info");
        assert!(config.api_token.is_none());
    }
}
