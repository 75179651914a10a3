//! Diagnostic analysis that bypasses persistence.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info_span, Instrument};

use crate::record::AnalysisResult;
use crate::strategy::Strategy;
use crate::verify::VerificationReport;

use super::error::PipelineError;
use super::runner::Pipeline;

#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub image_ref: String,
    pub strategy_key: Option<String>,
    pub verify_links: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetadata {
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub grounded: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub strategy: Strategy,
    pub result: AnalysisResult,
    pub metadata: EvaluationMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_verification: Option<VerificationReport>,
}

/// Runs the analysis steps for an image and optionally verifies its links.
/// No record is read or written.
pub async fn evaluate(
    pipeline: &Pipeline,
    request: EvaluateRequest,
) -> Result<EvaluationReport, PipelineError> {
    let image_ref = request.image_ref.trim();
    if image_ref.is_empty() {
        return Err(PipelineError::InvalidInput("missing imageRef".to_string()));
    }

    let started = Instant::now();
    let analysis = pipeline
        .analyze(image_ref, request.strategy_key.as_deref())
        .await?;

    let url_verification = if request.verify_links {
        Some(
            pipeline
                .verifier()
                .verify(&analysis.result)
                .instrument(info_span!("verify_links"))
                .await,
        )
    } else {
        None
    };

    Ok(EvaluationReport {
        strategy: analysis.strategy,
        result: analysis.result,
        metadata: EvaluationMetadata {
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
            grounded: analysis.grounded,
        },
        url_verification,
    })
}
