use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::record::DEFAULT_SOURCE;
use crate::secrets::{expand_home, SecretRef};
use crate::strategy::DEFAULT_STRATEGY_ID;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    /// Source tag for captures that do not send one.
    #[serde(default = "default_source")]
    pub default_source: String,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            model: ModelConfig::default(),
            processing: ProcessingConfig::default(),
            sweep: SweepConfig::default(),
            verifier: VerifierConfig::default(),
            default_source: default_source(),
        }
    }
}

impl Config {
    /// Database file: configured path (with `~` expanded), else
    /// `~/.snapcard/data/snapcard.db`, else `./snapcard.db`.
    pub fn database_path(&self) -> PathBuf {
        match self.database.path.as_deref() {
            Some(path) if !path.trim().is_empty() => PathBuf::from(expand_home(path)),
            _ => crate::db::default_database_path().unwrap_or_else(|| PathBuf::from("snapcard.db")),
        }
    }

    pub fn storage_directory(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.storage.directory))
    }

    /// Public base URL for archived images; defaults to this server's
    /// `/images` route.
    pub fn public_base_url(&self) -> String {
        match self.storage.public_base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://localhost:{}/images", self.server.port),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default = "default_storage_directory")]
    pub directory: String,
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_storage_directory() -> String {
    "~/.snapcard/images".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_directory(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key")]
    pub api_key: SecretRef,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    crate::ai::gemini::DEFAULT_API_BASE.to_string()
}

fn default_api_key() -> SecretRef {
    SecretRef::from_env_var("GEMINI_API_KEY")
}

fn default_request_timeout() -> u64 {
    45
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: default_api_key(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// What the Processing Stage does with links in model output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkCheckMode {
    #[default]
    Off,
    /// Verify and log unreachable URLs.
    Log,
    /// Verify and drop cards that reference unreachable URLs.
    DropCards,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingConfig {
    #[serde(default = "default_processing_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_strategy")]
    pub default_strategy: String,
    #[serde(default = "default_true")]
    pub single_flight: bool,
    #[serde(default)]
    pub link_check: LinkCheckMode,
}

fn default_processing_timeout() -> u64 {
    55
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY_ID.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_processing_timeout(),
            default_strategy: default_strategy(),
            single_flight: true,
            link_check: LinkCheckMode::Off,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Seconds between scheduled sweeps; 0 disables the scheduler.
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default)]
    pub retry_errors: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_batch_size() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            interval_secs: 0,
            retry_errors: false,
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    #[serde(default = "default_verifier_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_verifier_timeout() -> u64 {
    10
}

fn default_max_concurrency() -> usize {
    8
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_verifier_timeout(),
            max_concurrency: default_max_concurrency(),
        }
    }
}
