use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::RecordStore;
use crate::worker::Dispatcher;

use super::config::PipelineConfig;
use super::context::{DispatchOrigin, ProcessRequest};
use super::error::PipelineError;

/// Result of one sweep pass.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Number of records dispatched.
    pub processed: usize,
    pub handles: Vec<JoinHandle<()>>,
}

/// The Sweep Trigger: re-dispatches records stuck in `uploaded` (and,
/// optionally, retry-eligible `error` records).
pub struct Sweeper {
    store: Arc<dyn RecordStore>,
    dispatcher: Dispatcher,
    config: Arc<PipelineConfig>,
}

impl Sweeper {
    pub fn new(store: Arc<dyn RecordStore>, dispatcher: Dispatcher, config: Arc<PipelineConfig>) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    /// Dispatches up to `batch_size` eligible records, most recent first,
    /// without waiting for them.
    pub async fn sweep(&self, batch_size: Option<u32>) -> Result<SweepOutcome, PipelineError> {
        let limit = self.config.clamp_batch(batch_size);
        let pending = self
            .store
            .find_pending(self.config.retry_below(), limit)
            .await?;

        if pending.is_empty() {
            debug!("Sweep found no pending records");
            return Ok(SweepOutcome::default());
        }

        let handles: Vec<_> = pending
            .into_iter()
            .filter_map(|record| {
                self.dispatcher.dispatch(ProcessRequest::new(
                    record.id,
                    record.image_ref,
                    DispatchOrigin::Sweep,
                ))
            })
            .collect();

        info!(dispatched = handles.len(), limit, "Sweep dispatched pending records");

        Ok(SweepOutcome {
            processed: handles.len(),
            handles,
        })
    }
}
