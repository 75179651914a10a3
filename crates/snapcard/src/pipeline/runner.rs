use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::ai::{card_response_schema, parse_analysis, GenerationRequest, VisionModel};
use crate::config::LinkCheckMode;
use crate::db::record_repo::TransitionOutcome;
use crate::record::{AnalysisResult, PipelineRecord, RecordStatus};
use crate::sanitize;
use crate::storage::{ImageFetcher, IMAGE_CONTENT_TYPE};
use crate::store::RecordStore;
use crate::strategy::{Strategy, StrategyRegistry};
use crate::verify::{retain_verified_cards, LinkVerifier, VerificationReport};

use super::config::PipelineConfig;
use super::context::{AnalysisContext, DispatchOrigin, ProcessRequest};
use super::error::PipelineError;

/// Result of a processing run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed {
        status: RecordStatus,
        card_count: usize,
    },
    /// A sweep-originated run found the record no longer eligible.
    Skipped { reason: String },
}

/// Output of an analysis that is not tied to a record.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub strategy: Strategy,
    pub result: AnalysisResult,
    pub grounded: bool,
}

/// The Processing Stage: fetch → resolve strategy → model → parse → link check.
pub struct Pipeline {
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn ImageFetcher>,
    model: Arc<dyn VisionModel>,
    strategies: Arc<StrategyRegistry>,
    verifier: LinkVerifier,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        fetcher: Arc<dyn ImageFetcher>,
        model: Arc<dyn VisionModel>,
        strategies: Arc<StrategyRegistry>,
        verifier: LinkVerifier,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            store,
            fetcher,
            model,
            strategies,
            verifier,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn verifier(&self) -> &LinkVerifier {
        &self.verifier
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the Processing Stage for one record.
    ///
    /// Every failure after the record is confirmed processable is followed by
    /// a best-effort `error` write before the fault is returned.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessOutcome, PipelineError> {
        let span = info_span!("process_record",
            record_id = %request.id,
            origin = %request.origin,
            image = %sanitize::redact_image_ref(&request.image_ref),
        );
        self.process_inner(request).instrument(span).await
    }

    async fn process_inner(&self, request: ProcessRequest) -> Result<ProcessOutcome, PipelineError> {
        let record = self.store.get(&request.id).await?;

        if let Some(reason) = self.ineligibility(record.as_ref(), request.origin) {
            if request.origin == DispatchOrigin::Sweep {
                debug!(%reason, "Skipping sweep dispatch");
                return Ok(ProcessOutcome::Skipped { reason });
            }
            return Err(match record {
                None => PipelineError::NotFound(format!("record {}", request.id)),
                Some(_) => PipelineError::Conflict(reason),
            });
        }

        if !self.store.begin_attempt(&request.id).await? {
            return Err(PipelineError::NotFound(format!("record {}", request.id)));
        }

        let mut ctx = AnalysisContext::new(request.image_ref.clone(), request.strategy_key.clone());
        let timeout = self.config.processing_timeout;
        let outcome = match tokio::time::timeout(timeout, self.run_steps(&mut ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PipelineError::UpstreamUnavailable(format!(
                "processing timed out after {}s",
                timeout.as_secs()
            ))),
        };

        match outcome {
            Ok(result) => {
                let strategy_id = ctx.strategy_id().unwrap_or_default().to_string();
                self.finish_ready(&request.id, result, &strategy_id).await
            }
            Err(e) => {
                warn!(error = %e, "Processing failed");
                self.record_failure(&request.id, &e, ctx.strategy_id()).await;
                Err(e)
            }
        }
    }

    /// Why a record may not be processed for `origin`, if it may not.
    fn ineligibility(&self, record: Option<&PipelineRecord>, origin: DispatchOrigin) -> Option<String> {
        let Some(record) = record else {
            return Some("record no longer exists".to_string());
        };

        match (origin, record.status) {
            (_, RecordStatus::Saved) => Some("record is already saved".to_string()),
            (DispatchOrigin::Sweep, RecordStatus::Uploaded) => None,
            (DispatchOrigin::Sweep, RecordStatus::Error)
                if self.config.retry_errors && record.attempts < self.config.max_attempts =>
            {
                None
            }
            (DispatchOrigin::Sweep, status) => Some(format!("record is {}", status)),
            _ => None,
        }
    }

    async fn run_steps(&self, ctx: &mut AnalysisContext) -> Result<AnalysisResult, PipelineError> {
        self.analyze_steps(ctx).await?;

        if self.config.link_check != LinkCheckMode::Off {
            self.step_verify_links(ctx)
                .instrument(info_span!("verify_links"))
                .await;
        }

        ctx.result
            .take()
            .ok_or_else(|| PipelineError::Internal("analysis produced no result".to_string()))
    }

    /// Runs the analysis steps without touching any record.
    pub async fn analyze(
        &self,
        image_ref: &str,
        strategy_key: Option<&str>,
    ) -> Result<Analysis, PipelineError> {
        let mut ctx = AnalysisContext::new(image_ref, strategy_key.map(str::to_string));
        let timeout = self.config.processing_timeout;
        match tokio::time::timeout(timeout, self.analyze_steps(&mut ctx)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(PipelineError::UpstreamUnavailable(format!(
                    "analysis timed out after {}s",
                    timeout.as_secs()
                )))
            }
        }

        match (ctx.strategy, ctx.result) {
            (Some(strategy), Some(result)) => Ok(Analysis {
                strategy,
                result,
                grounded: ctx.output.map(|o| o.grounded).unwrap_or(false),
            }),
            _ => Err(PipelineError::Internal(
                "analysis finished without strategy or result".to_string(),
            )),
        }
    }

    async fn analyze_steps(&self, ctx: &mut AnalysisContext) -> Result<(), PipelineError> {
        // Step 1: fetch image bytes
        let image = self
            .fetcher
            .fetch(&ctx.image_ref)
            .instrument(info_span!("fetch_image"))
            .await?;
        debug!(size = image.len(), "Image fetched");
        ctx.image = Some(image);

        // Step 2: resolve strategy
        let strategy = self.strategies.resolve(ctx.strategy_key.as_deref())?.clone();
        ctx.strategy = Some(strategy);

        // Step 3: invoke model
        self.step_invoke_model(ctx)
            .instrument(info_span!("invoke_model"))
            .await?;

        // Step 4+5: strip fences and parse
        {
            let _step = info_span!("parse_result").entered();
            self.step_parse_result(ctx)?;
        }

        Ok(())
    }

    async fn step_invoke_model(&self, ctx: &mut AnalysisContext) -> Result<(), PipelineError> {
        let strategy = ctx
            .strategy
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("strategy not resolved".to_string()))?;
        let image = ctx
            .image
            .take()
            .ok_or_else(|| PipelineError::Internal("image not fetched".to_string()))?;

        // Response schemas are rejected when the search tool is enabled.
        let response_schema =
            (!strategy.use_external_search_tool).then(card_response_schema);

        let request = GenerationRequest {
            model_id: strategy.model_id.clone(),
            prompt: strategy.prompt_text.clone(),
            image,
            mime_type: IMAGE_CONTENT_TYPE.to_string(),
            use_search_tool: strategy.use_external_search_tool,
            response_schema,
        };

        info!(strategy = %strategy.id, model = %strategy.model_id, "Invoking model");
        let output = self.model.generate(request).await?;
        debug!(
            grounded = output.grounded,
            text_len = output.text.len(),
            "Model responded"
        );
        ctx.output = Some(output);
        Ok(())
    }

    fn step_parse_result(&self, ctx: &mut AnalysisContext) -> Result<(), PipelineError> {
        let text = ctx.output.as_ref().map(|o| o.text.as_str()).unwrap_or("");
        match parse_analysis(text) {
            Ok(result) => {
                debug!(cards = result.cards.len(), "Model output parsed");
                ctx.result = Some(result);
                Ok(())
            }
            Err(e) => {
                debug!(raw = %sanitize::truncate_for_log(text, 500), "Unparseable model output");
                Err(e.into())
            }
        }
    }

    async fn step_verify_links(&self, ctx: &mut AnalysisContext) {
        let Some(result) = ctx.result.take() else {
            return;
        };

        let report = self.verifier.verify(&result).await;
        log_hallucinations(&report);

        let result = if self.config.link_check == LinkCheckMode::DropCards {
            let (kept, dropped) = retain_verified_cards(result, &report);
            if dropped > 0 {
                info!(dropped, "Dropped cards with unreachable links");
            }
            kept
        } else {
            result
        };

        ctx.result = Some(result);
        ctx.link_report = Some(report);
    }

    async fn finish_ready(
        &self,
        id: &str,
        result: AnalysisResult,
        strategy_id: &str,
    ) -> Result<ProcessOutcome, PipelineError> {
        let card_count = result.cards.len();
        match self.store.mark_ready(id, &result, strategy_id).await {
            Ok(TransitionOutcome::Applied) => {
                info!(cards = card_count, "Record ready");
                Ok(ProcessOutcome::Completed {
                    status: RecordStatus::Ready,
                    card_count,
                })
            }
            Ok(TransitionOutcome::NotFound) => {
                warn!("Record deleted while processing; result discarded");
                Err(PipelineError::NotFound(format!("record {}", id)))
            }
            Ok(TransitionOutcome::Rejected { current }) => {
                warn!(%current, "Record changed while processing; result discarded");
                Err(PipelineError::Conflict(format!("record is {}", current)))
            }
            Err(e) => {
                let err = PipelineError::from(e);
                self.record_failure(id, &err, Some(strategy_id)).await;
                Err(err)
            }
        }
    }

    /// Best-effort `error` write. Failures are logged, never returned.
    async fn record_failure(&self, id: &str, error: &PipelineError, strategy_id: Option<&str>) {
        match self.store.mark_error(id, &error.to_string(), strategy_id).await {
            Ok(TransitionOutcome::Applied) => {}
            Ok(TransitionOutcome::NotFound) => {
                warn!("Could not record failure: record no longer exists");
            }
            Ok(TransitionOutcome::Rejected { current }) => {
                warn!(%current, "Could not record failure: status does not allow it");
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not record failure");
            }
        }
    }
}

fn log_hallucinations(report: &VerificationReport) {
    if report.all_valid {
        debug!(urls = report.total(), "All links reachable");
        return;
    }
    for invalid in &report.invalid_urls {
        warn!(
            url = %sanitize::redact_url(&invalid.url),
            status = invalid.status,
            error = invalid.error.as_deref(),
            "Model output references an unreachable URL"
        );
    }
}
