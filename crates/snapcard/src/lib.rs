pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod store;
pub mod strategy;
pub mod verify;
pub mod worker;

pub use api::{create_router, AppState};
pub use config::{load_config, resolve_config, Config};
pub use error::{ConfigError, Result, SnapcardError, StorageError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError};
pub use record::{AnalysisResult, Card, CardType, PipelineRecord, RecordStatus};
pub use secrets::{SecretError, SecretRef};
pub use store::{RecordStore, SqliteRecordStore};
pub use strategy::{Strategy, StrategyRegistry};
pub use verify::{LinkVerifier, VerificationReport};
pub use worker::{Dispatcher, SweepScheduler};
