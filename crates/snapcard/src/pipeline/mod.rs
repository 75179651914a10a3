//! The capture-to-card pipeline: ingestion, processing, sweep and evaluation.

pub mod config;
pub mod context;
pub mod error;
pub mod evaluate;
pub mod ingest;
pub mod runner;
pub mod sweep;

pub use config::PipelineConfig;
pub use context::{AnalysisContext, DispatchOrigin, ProcessRequest};
pub use error::PipelineError;
pub use evaluate::{evaluate, EvaluateRequest, EvaluationMetadata, EvaluationReport};
pub use ingest::{decode_image, IngestReceipt, Ingestor};
pub use runner::{Analysis, Pipeline, ProcessOutcome};
pub use sweep::{SweepOutcome, Sweeper};
