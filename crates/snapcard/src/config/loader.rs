use std::path::Path;

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;
use crate::strategy::StrategyRegistry;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

/// Environment variable naming the config file when no CLI argument is given.
pub const CONFIG_ENV_VAR: &str = "SNAPCARD_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the config named by `cli_path`, else by `SNAPCARD_CONFIG`, else
/// falls back to built-in defaults.
pub fn resolve_config(cli_path: Option<&str>) -> Result<Config, ConfigError> {
    let env_path = std::env::var(CONFIG_ENV_VAR).ok();
    let path = cli_path
        .or(env_path.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty());

    match path {
        Some(path) => load_config(path),
        None => {
            let config = Config::default();
            validate_config(&config)?;
            Ok(config)
        }
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if StrategyRegistry::with_default(&config.processing.default_strategy).is_err() {
        return Err(ConfigError::Validation {
            message: format!(
                "processing.defaultStrategy '{}' is not a known strategy",
                config.processing.default_strategy
            ),
        });
    }

    if !(1..=100).contains(&config.sweep.batch_size) {
        return Err(ConfigError::Validation {
            message: format!(
                "sweep.batchSize must be between 1 and 100, got {}",
                config.sweep.batch_size
            ),
        });
    }

    let positive = [
        ("processing.timeoutSecs", config.processing.timeout_secs),
        ("model.requestTimeoutSecs", config.model.request_timeout_secs),
        ("verifier.timeoutSecs", config.verifier.timeout_secs),
        ("sweep.maxAttempts", u64::from(config.sweep.max_attempts)),
        ("verifier.maxConcurrency", config.verifier.max_concurrency as u64),
    ];
    for (name, value) in positive {
        if value == 0 {
            return Err(ConfigError::Validation {
                message: format!("{} must be greater than zero", name),
            });
        }
    }

    Ok(())
}
