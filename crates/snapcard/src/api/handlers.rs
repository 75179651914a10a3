use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::record_repo::TransitionOutcome;
use crate::pipeline::{
    self, DispatchOrigin, EvaluateRequest, EvaluationReport, PipelineError, ProcessOutcome,
    ProcessRequest,
};
use crate::record::{PipelineRecord, RecordStatus};
use crate::strategy::Strategy;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

const DEFAULT_LIST_LIMIT: u64 = 100;
const MAX_LIST_LIMIT: u64 = 1000;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::invalid_input(e.body_text()))
}

fn require(field: Option<String>, name: &str) -> ApiResult<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::invalid_input(format!("missing {}", name)))
}

#[derive(Debug, Deserialize)]
pub struct IngestBody {
    pub image: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub id: String,
    pub image_ref: String,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestBody>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let body = json_body(payload)?;
    let receipt = state
        .ingestor
        .ingest(body.image.as_deref(), body.source)
        .await?;

    Ok(Json(IngestResponse {
        success: true,
        id: receipt.id,
        image_ref: receipt.image_ref,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBody {
    pub id: Option<String>,
    pub image_ref: Option<String>,
    pub strategy_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub id: String,
    pub status: RecordStatus,
}

/// Runs the Processing Stage inline and reports the resulting status.
pub async fn process(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessBody>, JsonRejection>,
) -> ApiResult<Json<ProcessResponse>> {
    let body = json_body(payload)?;
    let id = require(body.id, "id")?;
    let image_ref = require(body.image_ref, "imageRef")?;

    tracing::debug!(record_id = %id, "Direct processing requested");
    let request =
        ProcessRequest::new(&id, image_ref, DispatchOrigin::Direct).with_strategy(body.strategy_key);

    match state.pipeline.process(request).await? {
        ProcessOutcome::Completed { status, .. } => Ok(Json(ProcessResponse {
            success: true,
            id,
            status,
        })),
        ProcessOutcome::Skipped { reason } => Err(PipelineError::Conflict(reason).into()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepParams {
    pub batch_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    pub processed: usize,
}

/// Accepts `batchSize` from the query string or, for POST, a JSON body.
/// The query string wins when both are present.
pub async fn sweep(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SweepParams>, QueryRejection>,
    body: Bytes,
) -> ApiResult<Json<SweepResponse>> {
    let Query(params) = query.map_err(|e| ApiError::invalid_input(e.body_text()))?;

    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let parsed: SweepParams = serde_json::from_slice(&body)
            .map_err(|e| ApiError::invalid_input(format!("invalid sweep body: {}", e)))?;
        parsed.batch_size
    };

    let outcome = state.sweeper.sweep(params.batch_size.or(from_body)).await?;

    Ok(Json(SweepResponse {
        success: true,
        processed: outcome.processed,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateBody {
    pub image_ref: Option<String>,
    pub strategy_key: Option<String>,
    #[serde(default)]
    pub verify_links: bool,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: EvaluationReport,
}

async fn run_evaluation(
    state: &AppState,
    body: EvaluateBody,
    force_verify: bool,
) -> ApiResult<Json<EvaluateResponse>> {
    let request = EvaluateRequest {
        image_ref: require(body.image_ref, "imageRef")?,
        strategy_key: body.strategy_key,
        verify_links: force_verify || body.verify_links,
    };
    let report = pipeline::evaluate(&state.pipeline, request).await?;

    tracing::info!(
        strategy = %report.strategy.id,
        cards = report.result.cards.len(),
        duration_ms = report.metadata.duration_ms,
        "Evaluation finished"
    );

    Ok(Json(EvaluateResponse {
        success: true,
        report,
    }))
}

pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluateBody>, JsonRejection>,
) -> ApiResult<Json<EvaluateResponse>> {
    run_evaluation(&state, json_body(payload)?, false).await
}

pub async fn evaluate_verified(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluateBody>, JsonRejection>,
) -> ApiResult<Json<EvaluateResponse>> {
    run_evaluation(&state, json_body(payload)?, true).await
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub items: Vec<PipelineRecord>,
    pub count: usize,
}

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<RecordList>> {
    let Query(params) = query.map_err(|e| ApiError::invalid_input(e.body_text()))?;

    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<RecordStatus>)
        .transpose()
        .map_err(|e| ApiError::invalid_input(e.to_string()))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let items = state.store().list(status, limit).await?;
    Ok(Json(RecordList {
        count: items.len(),
        items,
    }))
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PipelineRecord>> {
    state
        .store()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("record {}", id)))
}

/// Consumer acknowledgement: `ready → saved`.
pub async fn save_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProcessResponse>> {
    match state.store().mark_saved(&id).await? {
        TransitionOutcome::Applied => {
            tracing::info!(record_id = %id, "Record saved");
            Ok(Json(ProcessResponse {
                success: true,
                id,
                status: RecordStatus::Saved,
            }))
        }
        TransitionOutcome::NotFound => Err(ApiError::not_found(format!("record {}", id))),
        TransitionOutcome::Rejected { current } => Err(PipelineError::Conflict(format!(
            "record is {}, only ready records can be saved",
            current
        ))
        .into()),
    }
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.store().delete(&id).await? {
        return Err(ApiError::not_found(format!("record {}", id)));
    }
    tracing::info!(record_id = %id, "Record deleted");
    Ok(Json(json!({ "success": true, "id": id })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyList {
    pub default_strategy: String,
    pub items: Vec<Strategy>,
}

pub async fn list_strategies(State(state): State<Arc<AppState>>) -> Json<StrategyList> {
    let registry = state.pipeline.strategies();
    Json(StrategyList {
        default_strategy: registry.default_id().to_string(),
        items: registry.list().into_iter().cloned().collect(),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.store().list(None, 1).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
        }
    }
}
