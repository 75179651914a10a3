use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::broadcast;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use snapcard::api::{self, AppState};
use snapcard::{resolve_config, SnapcardError, SweepScheduler};

/// Set to `json` for structured log lines.
const LOG_FORMAT_ENV: &str = "SNAPCARD_LOG_FORMAT";

fn init_tracing() {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records into tracing: {}", e);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let output = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let subscriber = tracing_subscriber::registry().with(output).with(filter);
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

async fn run() -> Result<(), SnapcardError> {
    let config_arg = std::env::args().nth(1);
    let config = resolve_config(config_arg.as_deref())?;

    info!(
        "Starting snapcard-server v{} (database: {}, images: {})",
        env!("CARGO_PKG_VERSION"),
        config.database_path().display(),
        config.storage_directory().display()
    );

    let state = Arc::new(AppState::from_config(&config)?);

    let scheduler = (config.sweep.interval_secs > 0).then(|| {
        SweepScheduler::new(
            Arc::clone(&state.sweeper),
            Duration::from_secs(config.sweep.interval_secs),
        )
    });
    let scheduler_task = scheduler.as_ref().map(|scheduler| {
        let (trigger, trigger_rx) = broadcast::channel(4);
        let handle = scheduler.start(trigger_rx);
        // Pick up records left in `uploaded` by a previous process.
        let _ = trigger.send(());
        info!(
            "Sweep scheduler running every {}s",
            config.sweep.interval_secs
        );
        (handle, trigger)
    });

    let listener = api::bind(&config.bind_address()).await?;
    let served = api::serve(listener, Arc::clone(&state), api::shutdown_signal()).await;

    if let Some(scheduler) = &scheduler {
        scheduler.stop();
    }
    if let Some((handle, _trigger)) = scheduler_task {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Sweep scheduler task ended abnormally");
        }
    }

    served
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "snapcard-server failed");
            ExitCode::FAILURE
        }
    }
}
