//! Image retrieval by reference.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::FilesystemStorage;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Image request returned HTTP {status}")]
    Status { status: u16 },

    #[error("Image request failed: {0}")]
    Transport(String),

    #[error("Failed to read local image '{path}': {source}")]
    Local {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// HTTP status for status-code failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// Loads image bytes for an image reference.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, image_ref: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches images over HTTP(S). Non-2xx responses are failures.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image_ref: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(image_ref)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Reads references issued by the local [`FilesystemStorage`] straight from
/// disk and falls back to HTTP for everything else.
pub struct LocalFirstFetcher {
    storage: Arc<FilesystemStorage>,
    http: HttpImageFetcher,
}

impl LocalFirstFetcher {
    pub fn new(storage: Arc<FilesystemStorage>, http: HttpImageFetcher) -> Self {
        Self { storage, http }
    }
}

#[async_trait]
impl ImageFetcher for LocalFirstFetcher {
    async fn fetch(&self, image_ref: &str) -> Result<Vec<u8>, FetchError> {
        let Some(path) = self.storage.resolve_local(image_ref) else {
            return self.http.fetch(image_ref).await;
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::Status { status: 404 })
            }
            Err(e) => Err(FetchError::Local {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http() -> HttpImageFetcher {
        HttpImageFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_http_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let bytes = http()
            .fetch(&format!("{}/img.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_http_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = http()
            .fetch(&format!("{}/missing.jpg", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_local_first_reads_from_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"local").unwrap();
        let storage = Arc::new(FilesystemStorage::new(dir.path(), "http://snap.local/images"));
        let fetcher = LocalFirstFetcher::new(storage, http());

        let bytes = fetcher.fetch("http://snap.local/images/a.jpg").await.unwrap();
        assert_eq!(bytes, b"local");

        let err = fetcher
            .fetch("http://snap.local/images/gone.jpg")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_local_first_falls_back_to_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/remote.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"remote".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FilesystemStorage::new(dir.path(), "http://snap.local/images"));
        let fetcher = LocalFirstFetcher::new(storage, http());

        let bytes = fetcher
            .fetch(&format!("{}/remote.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"remote");
    }
}
