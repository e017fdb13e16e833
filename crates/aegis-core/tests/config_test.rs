//! Tests for the Aegis configuration system.

use std::sync::Mutex;

use aegis_core::config::{AegisConfig, CliOverrides};
use aegis_core::errors::ConfigError;
use aegis_core::types::{FailOn, Severity};

/// Global mutex to serialize tests that modify environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn tempdir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

/// Clear all AEGIS_ env vars to prevent cross-test contamination.
fn clear_aegis_env_vars() {
    for key in [
        "AEGIS_FAIL_ON",
        "AEGIS_THREADS",
        "AEGIS_MAX_FILE_SIZE",
        "AEGIS_FILE_TIMEOUT_MS",
    ] {
        std::env::remove_var(key);
    }
}

/// CLI > env > project file > defaults.
#[test]
fn test_layered_resolution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_aegis_env_vars();

    let dir = tempdir();
    std::fs::write(
        dir.path().join("aegis.toml"),
        r#"
failOn = "warning"

[scan]
threads = 2
maxFileSize = 2000000
"#,
    )
    .unwrap();

    std::env::set_var("AEGIS_MAX_FILE_SIZE", "5000000");
    std::env::set_var("AEGIS_THREADS", "3");

    let cli = CliOverrides {
        threads: Some(8),
        ..Default::default()
    };
    let config = AegisConfig::load(dir.path(), None, Some(&cli)).unwrap();
    clear_aegis_env_vars();

    assert_eq!(config.scan.threads, Some(8), "CLI wins over env");
    assert_eq!(config.scan.max_file_size, Some(5_000_000), "env wins over file");
    assert_eq!(config.effective_fail_on(), FailOn::Warning, "file value kept");
}

#[test]
fn test_defaults_without_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_aegis_env_vars();

    let dir = tempdir();
    let config = AegisConfig::load(dir.path(), None, None).unwrap();
    assert!(config.rules.is_empty());
    assert_eq!(config.effective_fail_on(), FailOn::Error);
    assert_eq!(config.scan.effective_max_file_size(), 1_048_576);
    assert_eq!(config.scan.effective_threads(), 0);
}

#[test]
fn test_rule_settings_from_toml() {
    let config = AegisConfig::from_toml(
        r#"
excludePaths = ["vendor/**"]

[rules.no-weak-crypto]
enabled = false

[rules.require-rate-limit]
severity = "info"
excludePaths = ["scripts/**"]
"#,
    )
    .unwrap();

    assert_eq!(config.exclude_paths, vec!["vendor/**".to_string()]);
    assert!(!config.rules["no-weak-crypto"].effective_enabled());
    let rate = &config.rules["require-rate-limit"];
    assert!(rate.effective_enabled());
    assert_eq!(rate.severity, Some(Severity::Info));
    assert_eq!(rate.exclude_paths, vec!["scripts/**".to_string()]);
}

#[test]
fn test_rule_settings_from_json() {
    let config = AegisConfig::from_json(
        r#"{
            "rules": { "no-insecure-transport": { "enabled": true, "severity": "error" } },
            "failOn": "warning"
        }"#,
    )
    .unwrap();
    assert_eq!(
        config.rules["no-insecure-transport"].severity,
        Some(Severity::Error)
    );
    assert_eq!(config.fail_on, Some(FailOn::Warning));
}

#[test]
fn test_malformed_config_is_parse_error() {
    let err = AegisConfig::from_toml("failOn = [").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));

    let err = AegisConfig::from_toml("failOn = \"sometimes\"").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));

    // Typos inside a rule entry are rejected rather than silently ignored.
    let err = AegisConfig::from_toml("[rules.no-weak-crypto]\nenabeld = false").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = tempdir();
    let missing = dir.path().join("nope.toml");
    let err = AegisConfig::load(dir.path(), Some(&missing), None).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_json_file_by_extension() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_aegis_env_vars();

    let dir = tempdir();
    let path = dir.path().join("aegis.json");
    std::fs::write(&path, r#"{ "excludePaths": ["dist/**"] }"#).unwrap();
    let config = AegisConfig::load(dir.path(), Some(&path), None).unwrap();
    assert_eq!(config.exclude_paths, vec!["dist/**".to_string()]);
}

#[test]
fn test_validation_rejects_zero_values() {
    let config = AegisConfig::from_toml("[scan]\nmaxFileSize = 0").unwrap();
    let err = AegisConfig::validate(&config).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    let config = AegisConfig::from_toml("[scan]\nfileTimeoutMs = 0").unwrap();
    assert!(AegisConfig::validate(&config).is_err());
}

#[test]
fn test_toml_round_trip_preserves_rules() {
    let config = AegisConfig::from_toml(
        "failOn = \"warning\"\n[rules.no-hardcoded-secrets]\nseverity = \"warning\"\n",
    )
    .unwrap();
    let serialized = config.to_toml().unwrap();
    let back = AegisConfig::from_toml(&serialized).unwrap();
    assert_eq!(config, back);
}
