//! Configuration resolution for songbook-import
//!
//! Provides multi-tier resolution with CLI → ENV → TOML → default priority,
//! plus loading and seeding of the config file itself.

use std::path::{Path, PathBuf};

use songbook_common::config::{
    default_config_path, load_toml_config, write_toml_config, TomlConfig,
};
use tracing::{debug, info, warn};

use crate::error::{ReconcileError, ReconcileResult};

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "SONGBOOK_API_URL";

/// Environment variable holding the API bearer token
pub const API_TOKEN_ENV: &str = "SONGBOOK_API_TOKEN";

/// Compiled default API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the API base URL
///
/// **Priority:** CLI → `SONGBOOK_API_URL` → TOML → [`DEFAULT_API_URL`]
pub fn resolve_api_url(cli_url: Option<&str>, toml_config: &TomlConfig) -> String {
    if let Some(url) = non_empty(cli_url.map(str::to_string)) {
        info!(url = %url, "API URL from command line");
        return url;
    }

    if let Some(url) = non_empty(std::env::var(API_URL_ENV).ok()) {
        info!(url = %url, "API URL from environment variable");
        return url;
    }

    if let Some(url) = non_empty(toml_config.api_url.clone()) {
        info!(url = %url, "API URL from TOML config");
        return url;
    }

    debug!(url = DEFAULT_API_URL, "Using default API URL");
    DEFAULT_API_URL.to_string()
}

/// Resolve the API bearer token
///
/// **Priority:** `SONGBOOK_API_TOKEN` → TOML. No default; requests go out
/// unauthenticated when neither is set.
pub fn resolve_api_token(toml_config: &TomlConfig) -> Option<String> {
    if let Some(token) = non_empty(std::env::var(API_TOKEN_ENV).ok()) {
        debug!("API token from environment variable");
        return Some(token);
    }

    let token = non_empty(toml_config.api_token.clone());
    if token.is_some() {
        debug!("API token from TOML config");
    }
    token
}

/// Bootstrap configuration plus where it came from
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// File consulted, if a location could be determined
    pub path: Option<PathBuf>,
    /// Whether that file existed
    pub found: bool,
}

impl LoadedConfig {
    /// Report the config source; call once the subscriber is installed
    pub fn log_source(&self) {
        match (&self.path, self.found) {
            (Some(path), true) => info!("Loaded configuration from {}", path.display()),
            (Some(path), false) => warn!(
                "Config file not found at {}, using defaults",
                path.display()
            ),
            (None, _) => warn!("No config directory available, using defaults"),
        }
    }
}

/// Load the config file given on the command line, else the platform default
pub fn load_config(cli_path: Option<&Path>) -> ReconcileResult<LoadedConfig> {
    let Some(path) = cli_path.map(Path::to_path_buf).or_else(default_config_path) else {
        return Ok(LoadedConfig::default());
    };

    let found = path.exists();
    let config = load_toml_config(&path)?;
    Ok(LoadedConfig {
        config,
        path: Some(path),
        found,
    })
}

/// Write a config file seeded with the resolved API URL and timeout
///
/// Other values already in the file (token, logging) are kept. An existing
/// file is only replaced when `force` is set.
pub fn init_config_file(
    path: &Path,
    cli_url: Option<&str>,
    force: bool,
) -> ReconcileResult<TomlConfig> {
    if path.exists() && !force {
        return Err(ReconcileError::InvalidInput(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }

    let existing = load_toml_config(path)?;
    let config = TomlConfig {
        api_url: Some(resolve_api_url(cli_url, &existing)),
        request_timeout_secs: Some(existing.request_timeout_secs()),
        ..existing
    };

    write_toml_config(&config, path)?;
    info!(path = %path.display(), "Wrote config file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn toml_with_url(url: &str) -> TomlConfig {
        TomlConfig {
            api_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_cli_wins_over_everything() {
        std::env::set_var(API_URL_ENV, "http://env:1/api");
        let url = resolve_api_url(Some("http://cli:1/api"), &toml_with_url("http://toml:1/api"));
        std::env::remove_var(API_URL_ENV);
        assert_eq!(url, "http://cli:1/api");
    }

    #[test]
    #[serial]
    fn test_env_wins_over_toml() {
        std::env::set_var(API_URL_ENV, "http://env:1/api");
        let url = resolve_api_url(None, &toml_with_url("http://toml:1/api"));
        std::env::remove_var(API_URL_ENV);
        assert_eq!(url, "http://env:1/api");
    }

    #[test]
    #[serial]
    fn test_toml_then_default() {
        std::env::remove_var(API_URL_ENV);
        assert_eq!(
            resolve_api_url(None, &toml_with_url("http://toml:1/api")),
            "http://toml:1/api"
        );
        assert_eq!(resolve_api_url(Some("  "), &TomlConfig::default()), DEFAULT_API_URL);
    }

    #[test]
    #[serial]
    fn test_token_resolution() {
        std::env::remove_var(API_TOKEN_ENV);
        assert_eq!(resolve_api_token(&TomlConfig::default()), None);

        let config = TomlConfig {
            api_token: Some("from-toml".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_api_token(&config).as_deref(), Some("from-toml"));

        std::env::set_var(API_TOKEN_ENV, "from-env");
        let token = resolve_api_token(&config);
        std::env::remove_var(API_TOKEN_ENV);
        assert_eq!(token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("import.toml");

        let loaded = load_config(Some(&path)).unwrap();

        assert!(!loaded.found);
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config, TomlConfig::default());
    }

    #[test]
    fn test_load_config_malformed_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(&path, "api_url = [").unwrap();

        let result = load_config(Some(&path));

        assert!(matches!(
            result,
            Err(ReconcileError::Common(songbook_common::Error::Config(_)))
        ));
    }

    #[test]
    #[serial]
    fn test_init_config_writes_resolved_url() {
        std::env::remove_var(API_URL_ENV);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("songbook").join("import.toml");

        let written = init_config_file(&path, Some("http://cli:1/api"), false).unwrap();
        let loaded = load_config(Some(&path)).unwrap();

        assert!(loaded.found);
        assert_eq!(loaded.config, written);
        assert_eq!(loaded.config.api_url.as_deref(), Some("http://cli:1/api"));
        assert_eq!(loaded.config.request_timeout_secs, Some(30));
    }

    #[test]
    #[serial]
    fn test_init_config_keeps_token_and_refuses_without_force() {
        std::env::remove_var(API_URL_ENV);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(&path, "api_token = \"keep-me\"\nrequest_timeout_secs = 5\n").unwrap();

        let refused = init_config_file(&path, None, false);
        assert!(matches!(refused, Err(ReconcileError::InvalidInput(_))));

        let written = init_config_file(&path, None, true).unwrap();
        assert_eq!(written.api_token.as_deref(), Some("keep-me"));
        assert_eq!(written.request_timeout_secs, Some(5));
        assert_eq!(written.api_url.as_deref(), Some(DEFAULT_API_URL));
    }

    #[test]
    #[serial]
    fn test_init_config_unwritable_location_is_io_error() {
        std::env::remove_var(API_URL_ENV);
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let result = init_config_file(&blocker.join("import.toml"), None, false);

        assert!(matches!(
            result,
            Err(ReconcileError::Common(songbook_common::Error::Io(_)))
        ));
    }
}
