use std::time::Duration;

use crate::config::{Config, LinkCheckMode};
use crate::record::DEFAULT_SOURCE;

pub const MAX_SWEEP_BATCH: u32 = 100;

/// Runtime knobs of the pipeline, derived from [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub processing_timeout: Duration,
    pub link_check: LinkCheckMode,
    pub single_flight: bool,
    pub default_source: String,
    pub sweep_batch_size: u32,
    pub retry_errors: bool,
    pub max_attempts: u32,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            processing_timeout: Duration::from_secs(config.processing.timeout_secs),
            link_check: config.processing.link_check,
            single_flight: config.processing.single_flight,
            default_source: config.default_source.clone(),
            sweep_batch_size: config.sweep.batch_size,
            retry_errors: config.sweep.retry_errors,
            max_attempts: config.sweep.max_attempts,
        }
    }

    /// Attempt bound passed to the store when sweeping, if error retry is on.
    pub fn retry_below(&self) -> Option<u32> {
        self.retry_errors.then_some(self.max_attempts)
    }

    /// Clamps a requested sweep batch to `1..=100`, using the configured
    /// default when absent.
    pub fn clamp_batch(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.sweep_batch_size)
            .clamp(1, MAX_SWEEP_BATCH)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processing_timeout: Duration::from_secs(55),
            link_check: LinkCheckMode::Off,
            single_flight: true,
            default_source: DEFAULT_SOURCE.to_string(),
            sweep_batch_size: 10,
            retry_errors: false,
            max_attempts: 3,
        }
    }
}
