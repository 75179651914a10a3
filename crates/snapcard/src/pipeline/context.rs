use std::fmt;

use crate::ai::ModelOutput;
use crate::record::AnalysisResult;
use crate::strategy::Strategy;
use crate::verify::VerificationReport;

/// Who asked for a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrigin {
    /// Synchronous `/process` call.
    Direct,
    /// Fire-and-forget dispatch right after ingestion.
    Ingest,
    /// Re-dispatch by a sweep; eligibility is re-checked before running.
    Sweep,
}

impl fmt::Display for DispatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchOrigin::Direct => "direct",
            DispatchOrigin::Ingest => "ingest",
            DispatchOrigin::Sweep => "sweep",
        })
    }
}

/// Input of one processing run.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub id: String,
    pub image_ref: String,
    pub strategy_key: Option<String>,
    pub origin: DispatchOrigin,
}

impl ProcessRequest {
    pub fn new(id: impl Into<String>, image_ref: impl Into<String>, origin: DispatchOrigin) -> Self {
        Self {
            id: id.into(),
            image_ref: image_ref.into(),
            strategy_key: None,
            origin,
        }
    }

    pub fn with_strategy(mut self, key: Option<String>) -> Self {
        self.strategy_key = key;
        self
    }
}

/// State accumulated across analysis steps.
pub struct AnalysisContext {
    pub image_ref: String,
    pub strategy_key: Option<String>,

    // fetch_image
    pub image: Option<Vec<u8>>,

    // always Some after strategy resolution
    pub strategy: Option<Strategy>,

    // invoke_model
    pub output: Option<ModelOutput>,

    // parse_result
    pub result: Option<AnalysisResult>,

    // verify_links
    pub link_report: Option<VerificationReport>,
}

impl AnalysisContext {
    pub fn new(image_ref: impl Into<String>, strategy_key: Option<String>) -> Self {
        Self {
            image_ref: image_ref.into(),
            strategy_key,
            image: None,
            strategy: None,
            output: None,
            result: None,
            link_report: None,
        }
    }

    pub fn strategy_id(&self) -> Option<&str> {
        self.strategy.as_ref().map(|s| s.id.as_str())
    }
}
