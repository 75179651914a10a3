use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{GeminiClient, VisionModel};
use crate::config::Config;
use crate::db::Database;
use crate::error::{ConfigError, SnapcardError};
use crate::pipeline::{Ingestor, Pipeline, PipelineConfig, Sweeper};
use crate::storage::{
    FilesystemStorage, HttpImageFetcher, ImageFetcher, LocalFirstFetcher, ObjectStorage,
};
use crate::store::{RecordStore, SqliteRecordStore};
use crate::strategy::StrategyRegistry;
use crate::verify::LinkVerifier;
use crate::worker::Dispatcher;

/// Collaborators the application is assembled from.
pub struct Components {
    pub store: Arc<dyn RecordStore>,
    pub object_storage: Arc<dyn ObjectStorage>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub model: Arc<dyn VisionModel>,
    pub strategies: StrategyRegistry,
    pub verifier: LinkVerifier,
    pub config: PipelineConfig,
    /// Directory served under `/images`, if any.
    pub image_dir: Option<PathBuf>,
}

/// Shared state handed to every handler.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub dispatcher: Dispatcher,
    pub ingestor: Arc<Ingestor>,
    pub sweeper: Arc<Sweeper>,
    pub image_dir: Option<PathBuf>,
}

impl AppState {
    pub fn assemble(components: Components) -> Self {
        let config = Arc::new(components.config);
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&components.store),
            components.fetcher,
            components.model,
            Arc::new(components.strategies),
            components.verifier,
            Arc::clone(&config),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&pipeline));
        let ingestor = Arc::new(Ingestor::new(
            components.object_storage,
            Arc::clone(&components.store),
            dispatcher.clone(),
            config.default_source.clone(),
        ));
        let sweeper = Arc::new(Sweeper::new(
            components.store,
            dispatcher.clone(),
            Arc::clone(&config),
        ));

        Self {
            pipeline,
            dispatcher,
            ingestor,
            sweeper,
            image_dir: components.image_dir,
        }
    }

    /// Builds the production object graph from configuration.
    pub fn from_config(config: &Config) -> Result<Self, SnapcardError> {
        let db = Database::open(&config.database_path())?;
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db));

        let image_dir = config.storage_directory();
        let storage = Arc::new(FilesystemStorage::new(&image_dir, config.public_base_url()));

        let http = HttpImageFetcher::new(Duration::from_secs(config.model.request_timeout_secs))
            .map_err(|e| SnapcardError::Server(e.to_string()))?;
        let fetcher = Arc::new(LocalFirstFetcher::new(Arc::clone(&storage), http));

        let api_key = config
            .model
            .api_key
            .resolve_optional("model.apiKey")
            .map_err(ConfigError::from)?;
        if api_key.is_none() {
            tracing::warn!("No model API key configured; processing runs will fail until one is set");
        }
        let model = GeminiClient::new(
            config.model.api_base.clone(),
            api_key,
            Duration::from_secs(config.model.request_timeout_secs),
        )
        .map_err(|e| SnapcardError::Server(e.to_string()))?;

        let strategies = StrategyRegistry::with_default(&config.processing.default_strategy)
            .map_err(|e| ConfigError::Validation {
                message: e.to_string(),
            })?;

        let verifier = LinkVerifier::new(
            Duration::from_secs(config.verifier.timeout_secs),
            config.verifier.max_concurrency,
        )
        .map_err(|e| SnapcardError::Server(e.to_string()))?;

        Ok(Self::assemble(Components {
            store,
            object_storage: storage,
            fetcher,
            model: Arc::new(model),
            strategies,
            verifier,
            config: PipelineConfig::from_config(config),
            image_dir: Some(image_dir),
        }))
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.pipeline.store()
    }
}
