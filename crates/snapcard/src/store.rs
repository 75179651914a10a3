//! Record store abstraction used by the pipeline and the HTTP API.
//!
//! [`SqliteRecordStore`] is the production backend; it runs every repository
//! call on the blocking pool through [`Database::call`].

use async_trait::async_trait;

use crate::db::record_repo::{self, RecordFilter, RecordRow, Transition, TransitionOutcome};
use crate::db::{Database, DatabaseError};
use crate::record::{self, AnalysisResult, PipelineRecord, RecordStatus};

/// Persistent storage for pipeline records.
///
/// Status writes return a [`TransitionOutcome`] instead of failing so callers
/// decide whether a rejected or missing target is an error in their context.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, record: &PipelineRecord) -> Result<(), DatabaseError>;

    async fn get(&self, id: &str) -> Result<Option<PipelineRecord>, DatabaseError>;

    /// Lists records, most recent first.
    async fn list(
        &self,
        status: Option<RecordStatus>,
        limit: u64,
    ) -> Result<Vec<PipelineRecord>, DatabaseError>;

    /// Records a sweep may pick up. `retry_below` enables `error` records with
    /// fewer attempts than the bound.
    async fn find_pending(
        &self,
        retry_below: Option<u32>,
        limit: u32,
    ) -> Result<Vec<PipelineRecord>, DatabaseError>;

    /// Counts a processing run. Returns false when the record is gone.
    async fn begin_attempt(&self, id: &str) -> Result<bool, DatabaseError>;

    async fn mark_ready(
        &self,
        id: &str,
        result: &AnalysisResult,
        strategy_id: &str,
    ) -> Result<TransitionOutcome, DatabaseError>;

    async fn mark_error(
        &self,
        id: &str,
        message: &str,
        strategy_id: Option<&str>,
    ) -> Result<TransitionOutcome, DatabaseError>;

    async fn mark_saved(&self, id: &str) -> Result<TransitionOutcome, DatabaseError>;

    async fn delete(&self, id: &str) -> Result<bool, DatabaseError>;
}

/// SQLite-backed [`RecordStore`].
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn apply(&self, id: &str, transition: Transition) -> Result<TransitionOutcome, DatabaseError> {
        let id = id.to_string();
        self.db
            .call(move |db| record_repo::transition(db, &id, &transition))
            .await
    }
}

fn now() -> String {
    record_repo::format_timestamp(record::timestamp_now())
}

fn decode_all(rows: Vec<RecordRow>) -> Result<Vec<PipelineRecord>, DatabaseError> {
    rows.into_iter().map(RecordRow::into_record).collect()
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create(&self, record: &PipelineRecord) -> Result<(), DatabaseError> {
        let row = RecordRow::from_record(record)?;
        self.db.call(move |db| record_repo::insert(db, &row)).await
    }

    async fn get(&self, id: &str) -> Result<Option<PipelineRecord>, DatabaseError> {
        let id = id.to_string();
        let row = self.db.call(move |db| record_repo::find_by_id(db, &id)).await?;
        row.map(RecordRow::into_record).transpose()
    }

    async fn list(
        &self,
        status: Option<RecordStatus>,
        limit: u64,
    ) -> Result<Vec<PipelineRecord>, DatabaseError> {
        let filter = RecordFilter {
            status,
            limit: Some(limit),
            offset: None,
        };
        let (rows, _total) = self.db.call(move |db| record_repo::query(db, &filter)).await?;
        decode_all(rows)
    }

    async fn find_pending(
        &self,
        retry_below: Option<u32>,
        limit: u32,
    ) -> Result<Vec<PipelineRecord>, DatabaseError> {
        let rows = self
            .db
            .call(move |db| record_repo::find_pending(db, retry_below, limit))
            .await?;
        decode_all(rows)
    }

    async fn begin_attempt(&self, id: &str) -> Result<bool, DatabaseError> {
        let id = id.to_string();
        let updated_at = now();
        self.db
            .call(move |db| record_repo::increment_attempts(db, &id, &updated_at))
            .await
    }

    async fn mark_ready(
        &self,
        id: &str,
        result: &AnalysisResult,
        strategy_id: &str,
    ) -> Result<TransitionOutcome, DatabaseError> {
        let payload = serde_json::to_string(result).map_err(|e| DatabaseError::CorruptRow {
            id: id.to_string(),
            reason: format!("unserializable analysis result: {}", e),
        })?;
        self.apply(
            id,
            Transition {
                next: RecordStatus::Ready,
                analysis_result: Some(payload),
                error_message: None,
                strategy_id: Some(strategy_id.to_string()),
                updated_at: now(),
            },
        )
        .await
    }

    async fn mark_error(
        &self,
        id: &str,
        message: &str,
        strategy_id: Option<&str>,
    ) -> Result<TransitionOutcome, DatabaseError> {
        self.apply(
            id,
            Transition {
                next: RecordStatus::Error,
                analysis_result: None,
                error_message: Some(message.to_string()),
                strategy_id: strategy_id.map(str::to_string),
                updated_at: now(),
            },
        )
        .await
    }

    async fn mark_saved(&self, id: &str) -> Result<TransitionOutcome, DatabaseError> {
        self.apply(
            id,
            Transition {
                next: RecordStatus::Saved,
                analysis_result: None,
                error_message: None,
                strategy_id: None,
                updated_at: now(),
            },
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, DatabaseError> {
        let id = id.to_string();
        self.db.call(move |db| record_repo::delete(db, &id)).await
    }
}
