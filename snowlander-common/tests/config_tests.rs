//! Configuration loading and data folder resolution tests
//!
//! Tests that touch SNOWLANDER_DATA_FOLDER are marked #[serial] so they do
//! not race on the process environment.

use serial_test::serial;
use snowlander_common::config::{resolve_data_folder, PlayerConfig, DATA_FOLDER_ENV};
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/snowlander-env");
    let config = PlayerConfig {
        data_folder: Some(PathBuf::from("/tmp/snowlander-config")),
        ..PlayerConfig::default()
    };

    let folder = resolve_data_folder(Some(Path::new("/tmp/snowlander-cli")), &config);
    assert_eq!(folder, PathBuf::from("/tmp/snowlander-cli"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_config_file() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/snowlander-env");
    let config = PlayerConfig {
        data_folder: Some(PathBuf::from("/tmp/snowlander-config")),
        ..PlayerConfig::default()
    };

    assert_eq!(resolve_data_folder(None, &config), PathBuf::from("/tmp/snowlander-env"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_config_file_beats_default() {
    env::remove_var(DATA_FOLDER_ENV);
    let config = PlayerConfig {
        data_folder: Some(PathBuf::from("/tmp/snowlander-config")),
        ..PlayerConfig::default()
    };

    assert_eq!(resolve_data_folder(None, &config), PathBuf::from("/tmp/snowlander-config"));
}

#[test]
#[serial]
fn test_default_data_folder_when_nothing_set() {
    env::remove_var(DATA_FOLDER_ENV);
    let folder = resolve_data_folder(None, &PlayerConfig::default());
    assert!(!folder.as_os_str().is_empty());
    assert!(folder.to_string_lossy().contains("snowlander"));
}

#[test]
fn test_missing_config_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = PlayerConfig::load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, PlayerConfig::default());
}

#[test]
fn test_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        port = 8123
        default_volume = 0.8
        position_interval_ms = 1000

        [decoder]
        program = "/usr/local/bin/ffmpeg"
        "#,
    )
    .unwrap();

    let config = PlayerConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.port, 8123);
    assert_eq!(config.default_volume, 0.8);
    assert_eq!(config.position_interval_ms, 1000);
    assert_eq!(config.decoder.program, PathBuf::from("/usr/local/bin/ffmpeg"));
    // Untouched keys keep defaults
    assert_eq!(config.decoder.channels, 2);
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    assert!(PlayerConfig::load_or_default(Some(&path)).is_err());
}
