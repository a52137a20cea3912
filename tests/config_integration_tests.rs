//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Configuration loading and saving
//! - Default configuration generation
//! - Partial files falling back to defaults
//! - Environment overrides
//! - Validation of the loaded decoder and container settings

use camino::Utf8PathBuf;
use rental_scan::ConfigManager;
use rental_scan::decoder::DecoderCapabilities;
use rental_scan::models::{AppConfig, ConfigError};
use rental_scan::config::CONFIG_FILE_NAME;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

/// Each test gets its own env prefix so parallel tests never see each other's variables
fn manager(config_path: &Utf8PathBuf, prefix: &str) -> ConfigManager {
    ConfigManager::new(config_path)
        .unwrap()
        .with_env_prefix(prefix)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = manager(&config_path, "RSCAN_IT_CREATE");

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.config_path(), config_path.join(CONFIG_FILE_NAME));
}

#[test]
fn test_load_default_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let config = manager(&config_path, "RSCAN_IT_DEFAULT").load_config().unwrap();

    assert_eq!(config.server.base_url, "https://localhost:5000");
    assert_eq!(config.server.lookup_path, "/api/verify-qr");
    assert_eq!(config.server.details_path, "/lookup");
    assert_eq!(config.server.request_timeout_secs, 10);
    assert_eq!(config.timing.resume_delay_ms, 2000);
    assert_eq!(config.timing.navigation_delay_ms, 1000);
    assert_eq!(config.timing.visibility_resume_delay_ms, 500);
    assert_eq!(config.decoder.fps, 10);
    assert_eq!(config.decoder.qrbox_width, 250);
    assert_eq!(config.decoder.qrbox_height, 250);
    assert_eq!(config.manual_entry.max_code_length, 10);
}

#[test]
fn test_save_and_load_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = manager(&config_path, "RSCAN_IT_SAVE");

    let mut config = manager.load_config().unwrap();
    config.server.base_url = "https://10.0.0.5:5000".to_string();
    config.server.accept_invalid_certs = true;
    config.decoder.fps = 15;
    config.containers.video_region = "camera".to_string();

    manager.save_config(&config).unwrap();
    let loaded = manager.load_config().unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "server:\n  base_url: https://rentals.example\ntiming:\n  resume_delay_ms: 3500\n",
    )
    .unwrap();

    let config = manager(&config_path, "RSCAN_IT_PARTIAL").load_config().unwrap();

    assert_eq!(config.server.base_url, "https://rentals.example");
    assert_eq!(config.server.lookup_path, "/api/verify-qr");
    assert_eq!(config.timing.resume_delay_ms, 3500);
    assert_eq!(config.timing.navigation_delay_ms, 1000);
    assert_eq!(config.decoder, AppConfig::default().decoder);
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "server:\n  base_url: https://from-file\n",
    )
    .unwrap();

    // SAFETY: the variable names are unique to this test
    unsafe {
        std::env::set_var("RSCAN_IT_ENV_SERVER__BASE_URL", "https://from-env");
        std::env::set_var("RSCAN_IT_ENV_TIMING__RESUME_DELAY_MS", "750");
    }

    let config = manager(&config_path, "RSCAN_IT_ENV").load_config().unwrap();

    unsafe {
        std::env::remove_var("RSCAN_IT_ENV_SERVER__BASE_URL");
        std::env::remove_var("RSCAN_IT_ENV_TIMING__RESUME_DELAY_MS");
    }

    assert_eq!(config.server.base_url, "https://from-env");
    assert_eq!(config.timing.resume_delay_ms, 750);
}

#[test]
fn test_config_directory_creation() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let config_path = config_path.join("RentalScan Data");

    assert!(!config_path.exists());
    let _manager = ConfigManager::new(&config_path).unwrap();

    // Directory should now exist
    assert!(config_path.exists());
}

#[test]
fn test_invalid_yaml_handling() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "invalid: yaml: content: {{",
    )
    .unwrap();

    let result = manager(&config_path, "RSCAN_IT_INVALID").load_config();
    assert!(result.is_err(), "Should fail to parse invalid YAML");
}

#[test]
fn test_loaded_decoder_config_validated() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "decoder:\n  version: 1\n  fps: 120\n",
    )
    .unwrap();

    let config = manager(&config_path, "RSCAN_IT_DECODER").load_config().unwrap();
    let result = config.decoder.validate(&DecoderCapabilities::default());

    assert!(matches!(
        result,
        Err(ConfigError::OutOfRange { field: "fps", .. })
    ));
}

#[test]
fn test_loaded_duplicate_containers_rejected() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "containers:\n  error_banner: messages\n  status_banner: messages\n",
    )
    .unwrap();

    let config = manager(&config_path, "RSCAN_IT_CONTAINERS").load_config().unwrap();

    assert!(matches!(
        config.containers.validate(),
        Err(ConfigError::DuplicateContainer { .. })
    ));
}

#[test]
fn test_concurrent_config_access() {
    use std::sync::Arc;

    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = Arc::new(manager(&config_path, "RSCAN_IT_CONCURRENT"));
    manager.save_config(&AppConfig::default()).unwrap();

    // Spawn multiple threads reading config concurrently
    let mut handles = vec![];

    for _ in 0..10 {
        let manager_clone = manager.clone();
        let handle = std::thread::spawn(move || {
            let _config = manager_clone.load_config().unwrap();
        });
        handles.push(handle);
    }

    // All threads should complete successfully
    for handle in handles {
        handle.join().unwrap();
    }
}
