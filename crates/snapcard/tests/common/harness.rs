//! Test harness for isolated pipeline runs.
//!
//! `TestHarness` wires the real record store, object storage, fetcher,
//! dispatcher and router around a `ScriptedModel`, so tests drive the whole
//! service without network access to a model provider.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use snapcard::ai::{GenerationRequest, ModelError, ModelOutput, VisionModel};
use snapcard::api::{create_router, AppState, Components};
use snapcard::db::Database;
use snapcard::pipeline::PipelineConfig;
use snapcard::storage::{
    generate_object_key, FilesystemStorage, HttpImageFetcher, LocalFirstFetcher,
};
use snapcard::store::{RecordStore, SqliteRecordStore};
use snapcard::strategy::StrategyRegistry;
use snapcard::verify::LinkVerifier;
use snapcard::PipelineRecord;

use super::builders::FAKE_JPEG;

pub const PUBLIC_BASE_URL: &str = "http://snapcard.test/images";

/// A vision model that answers every call with a fixed reply.
pub struct ScriptedModel {
    reply: Result<String, String>,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            ..Self::replying("")
        }
    }

    /// Delays every reply, simulating a slow model.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<ModelOutput, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(ModelOutput {
                text: text.clone(),
                grounded: false,
            }),
            Err(message) => Err(ModelError::Status {
                status: 503,
                message: message.clone(),
            }),
        }
    }
}

/// Isolated service instance for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    pub image_dir: PathBuf,
    pub store: Arc<dyn RecordStore>,
    pub model: Arc<ScriptedModel>,
    pub state: Arc<AppState>,
}

impl TestHarness {
    pub fn new(model: ScriptedModel) -> Self {
        Self::with_config(model, PipelineConfig::default())
    }

    pub fn with_config(model: ScriptedModel, config: PipelineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let image_dir = temp_dir.path().join("images");

        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(
            Database::open_in_memory().expect("Failed to open database"),
        ));
        let storage = Arc::new(FilesystemStorage::new(&image_dir, PUBLIC_BASE_URL));
        let http = HttpImageFetcher::new(Duration::from_secs(5)).expect("Failed to build fetcher");
        let model = Arc::new(model);

        let state = AppState::assemble(Components {
            store: Arc::clone(&store),
            object_storage: storage.clone(),
            fetcher: Arc::new(LocalFirstFetcher::new(storage, http)),
            model: model.clone(),
            strategies: StrategyRegistry::builtin(),
            verifier: LinkVerifier::new(Duration::from_secs(2), 4)
                .expect("Failed to build verifier"),
            config,
            image_dir: Some(image_dir.clone()),
        });

        Self {
            temp_dir,
            image_dir,
            store,
            model,
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Sends one request through the router and decodes the JSON body.
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self.router().oneshot(request).await.expect("Router failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Creates an `uploaded` record pointing at `image_ref`.
    pub async fn seed_record(&self, image_ref: &str) -> PipelineRecord {
        let record = PipelineRecord::new_uploaded(image_ref, None);
        self.store.create(&record).await.expect("Failed to seed record");
        record
    }

    /// Writes `FAKE_JPEG` into the image directory and seeds an `uploaded`
    /// record referencing it.
    pub async fn seed_local_record(&self) -> PipelineRecord {
        std::fs::create_dir_all(&self.image_dir).expect("Failed to create image dir");
        let key = generate_object_key();
        std::fs::write(self.image_dir.join(&key), FAKE_JPEG).expect("Failed to write image");
        self.seed_record(&format!("{}/{}", PUBLIC_BASE_URL, key)).await
    }

    /// Polls until the record satisfies `done`, or panics after `timeout`.
    pub async fn wait_for<F>(&self, id: &str, timeout: Duration, done: F) -> PipelineRecord
    where
        F: Fn(&PipelineRecord) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(record) = self.store.get(id).await.expect("Failed to read record") {
                if done(&record) {
                    return record;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("record {} did not reach the expected state in time", id);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn stored_images(&self) -> usize {
        std::fs::read_dir(&self.image_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
