//! Integration tests for logging configuration

use entity_store::config::{load_config_from_str, LoggingConfig};
use entity_store::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_logging_section_parsed() {
    let config = load_config_from_str(
        r#"
backend = "memory"

[logging]
local_enabled = true
local_path = "/var/log/entity-store"
local_rotation = "never"
"#,
    )
    .unwrap();

    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_path, "/var/log/entity-store");
    assert_eq!(config.logging.local_rotation, "never");
}

#[test]
fn test_init_logging_creates_log_directory() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "daily".to_string(),
    };
    assert!(!log_path.exists());

    // Only one global subscriber per process; this is the only test here
    // that installs one
    let guard = init_logging("debug", &config).unwrap();
    tracing::info!(entity_type = "order", "Logging initialized");
    drop(guard);

    assert!(log_path.exists());
}

#[test]
fn test_invalid_level_rejected() {
    assert!(init_logging("loud", &LoggingConfig::default()).is_err());
}
