//! Server lifecycle.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::error::SnapcardError;

use super::routes::create_router;
use super::state::AppState;

/// Binds `address` and returns the listener.
pub async fn bind(address: &str) -> Result<TcpListener, SnapcardError> {
    TcpListener::bind(address)
        .await
        .map_err(|e| SnapcardError::Server(format!("Failed to bind to {}: {}", address, e)))
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), SnapcardError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| SnapcardError::Server(e.to_string()))?;
    let router = create_router(state);

    tracing::info!(%addr, "snapcard server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SnapcardError::Server(format!("Server error: {}", e)))?;

    tracing::info!("snapcard server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    use super::*;
    use crate::ai::{GenerationRequest, ModelError, ModelOutput, VisionModel};
    use crate::api::Components;
    use crate::db::Database;
    use crate::pipeline::PipelineConfig;
    use crate::storage::{FetchError, FilesystemStorage, ImageFetcher};
    use crate::store::SqliteRecordStore;
    use crate::strategy::StrategyRegistry;
    use crate::verify::LinkVerifier;

    struct NoImages;

    #[async_trait]
    impl ImageFetcher for NoImages {
        async fn fetch(&self, _image_ref: &str) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Status { status: 404 })
        }
    }

    struct NoModel;

    #[async_trait]
    impl VisionModel for NoModel {
        async fn generate(&self, _request: GenerationRequest) -> Result<ModelOutput, ModelError> {
            Err(ModelError::MissingCredential)
        }
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let state = AppState::assemble(Components {
            store: Arc::new(SqliteRecordStore::new(Database::open_in_memory().unwrap())),
            object_storage: Arc::new(FilesystemStorage::new(dir.path(), "http://localhost/images")),
            fetcher: Arc::new(NoImages),
            model: Arc::new(NoModel),
            strategies: StrategyRegistry::builtin(),
            verifier: LinkVerifier::new(Duration::from_secs(1), 1).unwrap(),
            config: PipelineConfig::default(),
            image_dir: None,
        });

        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, Arc::new(state), async move {
            let _ = stop_rx.await;
        }));

        let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
        assert_eq!(response.status(), 200);

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let err = bind("not-an-address").await.unwrap_err();
        assert!(matches!(err, SnapcardError::Server(_)));
    }
}
