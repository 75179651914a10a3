//! Periodic sweep scheduler.
//!
//! Runs the Sweep Trigger on a fixed interval and whenever a manual trigger
//! arrives on the broadcast channel. Stops when [`SweepScheduler::stop`] is
//! called.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::pipeline::Sweeper;

pub struct SweepScheduler {
    sweeper: Arc<Sweeper>,
    interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl SweepScheduler {
    pub fn new(sweeper: Arc<Sweeper>, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            sweeper,
            interval,
            shutdown,
        }
    }

    /// Starts the sweep loop as a background task.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let sweeper = Arc::clone(&self.sweeper);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.tick().await; // skip immediate first tick

            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                tokio::select! {
                    _ = interval_timer.tick() => {},
                    Ok(()) = trigger_rx.recv() => {
                        log::info!("Manual sweep triggered");
                    },
                    _ = shutdown_rx.changed() => break,
                }

                match sweeper.sweep(None).await {
                    Ok(outcome) if outcome.processed > 0 => {
                        log::info!("Scheduled sweep dispatched {} records", outcome.processed);
                    }
                    Err(e) => log::error!("Scheduled sweep failed: {}", e),
                    _ => {}
                }
            }

            log::info!("Sweep scheduler stopped");
        })
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}
