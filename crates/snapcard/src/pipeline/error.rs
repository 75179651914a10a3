use thiserror::Error;

use crate::ai::{ModelError, ParseError};
use crate::db::DatabaseError;
use crate::error::StorageError;
use crate::storage::FetchError;
use crate::strategy::StrategyError;

/// Failure taxonomy shared by every pipeline operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Failed to parse model output: {0}")]
    ParseFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "INVALID_INPUT",
            PipelineError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            PipelineError::ParseFailure(_) => "PARSE_FAILURE",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::Conflict(_) => "CONFLICT",
            PipelineError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<FetchError> for PipelineError {
    fn from(e: FetchError) -> Self {
        PipelineError::UpstreamUnavailable(format!("failed to fetch image: {}", e))
    }
}

impl From<ModelError> for PipelineError {
    fn from(e: ModelError) -> Self {
        PipelineError::UpstreamUnavailable(e.to_string())
    }
}

impl From<ParseError> for PipelineError {
    fn from(e: ParseError) -> Self {
        PipelineError::ParseFailure(e.to_string())
    }
}

impl From<StrategyError> for PipelineError {
    fn from(e: StrategyError) -> Self {
        PipelineError::NotFound(e.to_string())
    }
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        PipelineError::UpstreamUnavailable(e.to_string())
    }
}

impl From<DatabaseError> for PipelineError {
    fn from(e: DatabaseError) -> Self {
        PipelineError::UpstreamUnavailable(format!("record store: {}", e))
    }
}
