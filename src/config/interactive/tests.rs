use super::{load_existing_config, target_path};
use crate::config::Config;
use std::fs;
use tempfile::TempDir;

#[test]
fn load_existing_config_without_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = load_existing_config(&temp_dir.path().join("config.toml"));
    assert_eq!(config, Config::default());
}

#[test]
fn load_existing_config_with_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[server]\nport = 4242\n").expect("should write config file");

    let config = load_existing_config(&config_path);
    assert_eq!(config.server.port, 4242);
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn load_existing_config_with_broken_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[server\nport = 4242\n").expect("should write config file");

    assert_eq!(load_existing_config(&config_path), Config::default());
}

#[test]
fn explicit_target_path_wins() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("custom.toml");

    let resolved = target_path(Some(&config_path)).expect("should resolve path");
    assert_eq!(resolved, config_path);
}
