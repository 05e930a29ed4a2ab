//! Unit tests for TOML atomic write utilities
//!
//! Tests the implementation of:
//! - Atomic file operations (temp + rename)
//! - Parent directory creation
//! - Round trip through load_toml_config
//! - Permissions 0600 (Unix)
//! - I/O failures surface as Error::Io

use songbook_common::config::{load_toml_config, write_toml_config, LoggingConfig, TomlConfig};
use songbook_common::Error;
use tempfile::TempDir;

fn sample_config() -> TomlConfig {
    TomlConfig {
        api_url: Some("http://localhost:3001/api".to_string()),
        api_token: Some("token123".to_string()),
        request_timeout_secs: Some(15),
        logging: LoggingConfig::default(),
    }
}

#[test]
fn test_atomic_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("import.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(target.exists());
    assert!(!temp_dir.path().join("import.toml.tmp").exists());
}

#[test]
fn test_write_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("songbook").join("import.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(target.exists());
}

#[test]
fn test_written_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("import.toml");
    let config = sample_config();

    write_toml_config(&config, &target).unwrap();
    let loaded = load_toml_config(&target).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_overwrite_replaces_previous_contents() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("import.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    let updated = TomlConfig {
        api_token: None,
        ..sample_config()
    };
    write_toml_config(&updated, &target).unwrap();

    let loaded = load_toml_config(&target).unwrap();
    assert!(loaded.api_token.is_none());
    assert_eq!(loaded.request_timeout_secs, Some(15));
}

#[cfg(unix)]
#[test]
fn test_written_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("import.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_write_below_regular_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, "file, not directory").unwrap();

    let result = write_toml_config(&sample_config(), &blocker.join("import.toml"));

    assert!(matches!(result, Err(Error::Io(_))));
}
