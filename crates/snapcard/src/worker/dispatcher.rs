use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::pipeline::{Pipeline, ProcessOutcome, ProcessRequest};

/// Extra lifetime of a single-flight entry beyond the processing timeout.
const GUARD_SLACK: Duration = Duration::from_secs(5);

/// Fire-and-forget launcher for processing runs.
///
/// Each dispatch is a detached tokio task with its own error boundary: the
/// caller never sees the run's result. With single-flight enabled, a dispatch
/// for an id that already has a run in flight is skipped.
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: Arc<Pipeline>,
    in_flight: Option<Cache<String, ()>>,
}

impl Dispatcher {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let config = pipeline.config();
        let in_flight = config.single_flight.then(|| {
            Cache::builder()
                .time_to_live(config.processing_timeout + GUARD_SLACK)
                .build()
        });
        Self {
            pipeline,
            in_flight,
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Whether a dispatched run for `id` is currently in flight.
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|guard| guard.contains_key(id))
    }

    /// Spawns a processing run without awaiting it.
    ///
    /// Returns `None` when the run was not started (no runtime, or another
    /// run for the same id is in flight). Dropping the handle detaches the
    /// task; it keeps running.
    pub fn dispatch(&self, request: ProcessRequest) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(record_id = %request.id, error = %e, "Dispatch failed: no async runtime");
                return None;
            }
        };

        if let Some(guard) = &self.in_flight {
            let entry = guard.entry(request.id.clone()).or_insert(());
            if !entry.is_fresh() {
                debug!(record_id = %request.id, "Run already in flight; dispatch skipped");
                return None;
            }
        }

        let pipeline = Arc::clone(&self.pipeline);
        let guard = self.in_flight.clone();

        Some(runtime.spawn(async move {
            let id = request.id.clone();
            let origin = request.origin;

            match pipeline.process(request).await {
                Ok(ProcessOutcome::Completed { status, card_count }) => {
                    debug!(record_id = %id, %origin, %status, card_count, "Dispatched run finished");
                }
                Ok(ProcessOutcome::Skipped { reason }) => {
                    debug!(record_id = %id, %origin, %reason, "Dispatched run skipped");
                }
                Err(e) => {
                    warn!(record_id = %id, %origin, error = %e, "Dispatched run failed");
                }
            }

            if let Some(guard) = guard {
                guard.invalidate(&id);
            }
        }))
    }
}
