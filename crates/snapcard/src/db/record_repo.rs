//! Record repository: CRUD and status transitions for the `records` table.
//!
//! Status writes are conditional single-row updates: the `WHERE` clause only
//! matches rows whose current status may legally move to the target status,
//! so a `saved` record is never clobbered by a late processing run.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::record::{AnalysisResult, PipelineRecord, RecordStatus};

/// A raw record row from the database.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: String,
    pub image_ref: String,
    pub status: String,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
    pub analysis_result: Option<String>,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub strategy_id: Option<String>,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            image_ref: row.get("image_ref")?,
            status: row.get("status")?,
            source: row.get("source")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            analysis_result: row.get("analysis_result")?,
            error_message: row.get("error_message")?,
            attempts: row.get("attempts")?,
            strategy_id: row.get("strategy_id")?,
        })
    }

    /// Converts a domain record into its row form.
    pub fn from_record(record: &PipelineRecord) -> Result<Self, DatabaseError> {
        let analysis_result = record
            .analysis_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DatabaseError::CorruptRow {
                id: record.id.clone(),
                reason: format!("unserializable analysis result: {}", e),
            })?;

        Ok(Self {
            id: record.id.clone(),
            image_ref: record.image_ref.clone(),
            status: record.status.as_str().to_string(),
            source: record.source.clone(),
            created_at: format_timestamp(record.created_at),
            updated_at: format_timestamp(record.updated_at),
            analysis_result,
            error_message: record.error_message.clone(),
            attempts: record.attempts,
            strategy_id: record.strategy_id.clone(),
        })
    }

    /// Decodes the row into a domain record.
    pub fn into_record(self) -> Result<PipelineRecord, DatabaseError> {
        let corrupt = |reason: String| DatabaseError::CorruptRow {
            id: self.id.clone(),
            reason,
        };

        let status: RecordStatus = self.status.parse().map_err(|e| corrupt(format!("{}", e)))?;
        let created_at = parse_timestamp(&self.created_at).map_err(corrupt)?;
        let updated_at = parse_timestamp(&self.updated_at).map_err(corrupt)?;
        let analysis_result = self
            .analysis_result
            .as_deref()
            .map(serde_json::from_str::<AnalysisResult>)
            .transpose()
            .map_err(|e| corrupt(format!("invalid analysis_result: {}", e)))?;

        Ok(PipelineRecord {
            id: self.id,
            image_ref: self.image_ref,
            status,
            source: self.source,
            created_at,
            updated_at,
            analysis_result,
            error_message: self.error_message,
            attempts: self.attempts,
            strategy_id: self.strategy_id,
        })
    }
}

/// Fixed-width RFC 3339 so lexical order equals chronological order.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
}

/// Query filter parameters for record listing.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub status: Option<RecordStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Result of a conditional status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// No row with that id.
    NotFound,
    /// The row exists but its status does not allow the transition.
    Rejected { current: RecordStatus },
}

/// Payload written together with a status transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub next: RecordStatus,
    /// Serialized `AnalysisResult`; required for `ready`, ignored otherwise.
    pub analysis_result: Option<String>,
    pub error_message: Option<String>,
    pub strategy_id: Option<String>,
    pub updated_at: String,
}

/// Inserts a new record row.
pub fn insert(db: &Database, row: &RecordRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO records (id, image_ref, status, source, created_at, updated_at,
             analysis_result, error_message, attempts, strategy_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.id,
                row.image_ref,
                row.status,
                row.source,
                row.created_at,
                row.updated_at,
                row.analysis_result,
                row.error_message,
                row.attempts,
                row.strategy_id,
            ],
        )?;
        Ok(())
    })
}

/// Finds a record by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RecordRow>, DatabaseError> {
    db.with_conn(|conn| select_one(conn, id))
}

fn select_one(conn: &Connection, id: &str) -> Result<Option<RecordRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM records WHERE id = ?1",
            params![id],
            RecordRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Queries records, most recent first, returning (rows, total_count).
pub fn query(db: &Database, filter: &RecordFilter) -> Result<(Vec<RecordRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let status = filter.status.map(|s| s.as_str());
        let total: u64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE (?1 IS NULL OR status = ?1)",
            params![status],
            |r| r.get(0),
        )?;

        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        let mut stmt = conn.prepare(
            "SELECT * FROM records WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![status, limit, offset], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Records eligible for a sweep: every `uploaded` row, plus `error` rows with
/// fewer than `retry_below` attempts when a retry bound is given.
pub fn find_pending(
    db: &Database,
    retry_below: Option<u32>,
    limit: u32,
) -> Result<Vec<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM records
             WHERE status = 'uploaded'
                OR (?1 IS NOT NULL AND status = 'error' AND attempts < ?1)
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![retry_below, limit], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Bumps the attempt counter. Returns false if the record does not exist.
pub fn increment_attempts(db: &Database, id: &str, updated_at: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE records SET attempts = attempts + 1, updated_at = ?2 WHERE id = ?1",
            params![id, updated_at],
        )?;
        Ok(changed > 0)
    })
}

/// Applies a conditional status transition.
///
/// `ready` writes store the analysis result and clear any error message;
/// `error` writes store the message and clear the result; `saved` only
/// changes the status.
pub fn transition(
    db: &Database,
    id: &str,
    transition: &Transition,
) -> Result<TransitionOutcome, DatabaseError> {
    let sources = RecordStatus::sources_for(transition.next)
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    if sources.is_empty() {
        return Err(DatabaseError::CorruptRow {
            id: id.to_string(),
            reason: format!("no status may transition into '{}'", transition.next),
        });
    }

    let sql = match transition.next {
        RecordStatus::Ready => format!(
            "UPDATE records SET status = 'ready', analysis_result = ?2, error_message = NULL,
             strategy_id = COALESCE(?3, strategy_id), updated_at = ?4
             WHERE id = ?1 AND status IN ({})",
            sources
        ),
        RecordStatus::Error => format!(
            "UPDATE records SET status = 'error', analysis_result = NULL, error_message = ?2,
             strategy_id = COALESCE(?3, strategy_id), updated_at = ?4
             WHERE id = ?1 AND status IN ({})",
            sources
        ),
        RecordStatus::Saved => format!(
            "UPDATE records SET status = 'saved', updated_at = ?4
             WHERE id = ?1 AND status IN ({})",
            sources
        ),
        RecordStatus::Uploaded => {
            return Err(DatabaseError::CorruptRow {
                id: id.to_string(),
                reason: "records cannot return to 'uploaded'".to_string(),
            })
        }
    };

    let payload = match transition.next {
        RecordStatus::Ready => transition.analysis_result.clone(),
        RecordStatus::Error => Some(
            transition
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        ),
        _ => None,
    };

    if transition.next == RecordStatus::Ready && payload.is_none() {
        return Err(DatabaseError::CorruptRow {
            id: id.to_string(),
            reason: "ready transition without analysis result".to_string(),
        });
    }

    db.with_conn(|conn| {
        let changed = conn.execute(
            &sql,
            params![id, payload, transition.strategy_id, transition.updated_at],
        )?;
        if changed > 0 {
            return Ok(TransitionOutcome::Applied);
        }

        match select_one(conn, id)? {
            None => Ok(TransitionOutcome::NotFound),
            Some(row) => {
                let current = row.status.parse().map_err(|e| DatabaseError::CorruptRow {
                    id: id.to_string(),
                    reason: format!("{}", e),
                })?;
                Ok(TransitionOutcome::Rejected { current })
            }
        }
    })
}

/// Deletes a record. Returns false if it did not exist.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}

/// Counts records with the given status.
pub fn count_by_status(db: &Database, status: RecordStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
