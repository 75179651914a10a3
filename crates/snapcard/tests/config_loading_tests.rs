//! Table-driven tests for configuration loading and validation.

mod common;

use std::path::PathBuf;

use tempfile::TempDir;

use common::ConfigBuilder;
use snapcard::config::{load_config, load_config_from_str, LinkCheckMode};
use snapcard::ConfigError;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "server": { "host": "127.0.0.1", "port": 9000 },
            "database": { "path": "/tmp/snapcard.db" },
            "storage": { "directory": "/tmp/images", "publicBaseUrl": "https://cdn.example.com/i" },
            "model": {
                "apiBase": "https://generativelanguage.googleapis.com/v1beta",
                "apiKey": { "envVar": "MY_GEMINI_KEY" },
                "requestTimeoutSecs": 30
            },
            "processing": {
                "timeoutSecs": 40,
                "defaultStrategy": "v2-with-search",
                "singleFlight": false,
                "linkCheck": "dropCards"
            },
            "sweep": { "batchSize": 25, "intervalSecs": 60, "retryErrors": true, "maxAttempts": 5 },
            "verifier": { "timeoutSecs": 5, "maxConcurrency": 16 },
            "defaultSource": "ios-shortcut"
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "invalid_json",
        config_json: "{ not json",
        should_succeed: false,
        expected_error: Some("parse"),
    },
    ConfigTestCase {
        name: "wrong_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_field",
        config_json: r#"{ "workers": 4 }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "batch_size_out_of_range",
        config_json: r#"{ "sweep": { "batchSize": 500 } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_link_check_mode",
        config_json: r#"{ "processing": { "linkCheck": "strict" } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_default_strategy",
        config_json: r#"{ "processing": { "defaultStrategy": "v9-experimental" } }"#,
        should_succeed: false,
        expected_error: Some("not a known strategy"),
    },
    ConfigTestCase {
        name: "zero_timeout",
        config_json: r#"{ "processing": { "timeoutSecs": 0 } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
];

#[test]
fn test_json_config_table() {
    for case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);
        match (case.should_succeed, result) {
            (true, Ok(_)) => {}
            (true, Err(e)) => panic!("[{}] expected success, got error: {}", case.name, e),
            (false, Ok(_)) => panic!("[{}] expected failure, got success", case.name),
            (false, Err(e)) => {
                if let Some(expected) = case.expected_error {
                    let message = e.to_string();
                    assert!(
                        message.contains(expected),
                        "[{}] error '{}' does not contain '{}'",
                        case.name,
                        message,
                        expected
                    );
                }
            }
        }
    }
}

#[test]
fn test_full_config_values() {
    let config = load_config_from_str(JSON_CONFIG_TESTS[1].config_json).unwrap();
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
    assert_eq!(config.database_path(), PathBuf::from("/tmp/snapcard.db"));
    assert_eq!(config.public_base_url(), "https://cdn.example.com/i");
    assert_eq!(config.processing.link_check, LinkCheckMode::DropCards);
    assert!(!config.processing.single_flight);
    assert_eq!(config.sweep.batch_size, 25);
    assert!(config.sweep.retry_errors);
    assert_eq!(config.default_source, "ios-shortcut");
    assert_eq!(
        config.model.api_key.env_var.as_deref(),
        Some("MY_GEMINI_KEY")
    );
}

#[test]
fn test_load_from_file_with_builder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapcard.json");
    let json = ConfigBuilder::new()
        .database_path("/var/lib/snapcard/db.sqlite")
        .storage_directory("/var/lib/snapcard/images")
        .default_strategy("v2-with-search")
        .sweep_batch_size(50)
        .build();
    std::fs::write(&path, json).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.processing.default_strategy, "v2-with-search");
    assert_eq!(config.sweep.batch_size, 50);
    assert_eq!(
        config.storage_directory(),
        PathBuf::from("/var/lib/snapcard/images")
    );
    assert_eq!(config.public_base_url(), "http://localhost:8080/images");
}

#[test]
fn test_missing_file_is_read_error() {
    let err = load_config("/definitely/not/here/snapcard.json").unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}
