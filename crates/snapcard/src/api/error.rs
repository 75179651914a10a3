use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::pipeline::PipelineError;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

/// HTTP-facing wrapper around [`PipelineError`].
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self(PipelineError::InvalidInput(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(PipelineError::NotFound(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Conflict(_) => StatusCode::CONFLICT,
            PipelineError::UpstreamUnavailable(_)
            | PipelineError::ParseFailure(_)
            | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.code(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, code = self.0.code(), "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}
