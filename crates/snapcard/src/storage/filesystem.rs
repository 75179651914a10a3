use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{validate_key, ObjectStorage};
use crate::error::StorageError;

/// Stores objects as flat files in one directory, served under a public
/// base URL (the HTTP API mounts the directory at `/images`).
pub struct FilesystemStorage {
    directory: PathBuf,
    public_base_url: String,
}

impl FilesystemStorage {
    pub fn new<P: AsRef<Path>>(directory: P, public_base_url: impl Into<String>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Public URL for `key`.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Maps a public URL issued by this storage back to its file.
    ///
    /// Returns `None` for references that point elsewhere.
    pub fn resolve_local(&self, image_ref: &str) -> Option<PathBuf> {
        let key = image_ref
            .strip_prefix(&self.public_base_url)?
            .strip_prefix('/')?;
        validate_key(key).ok()?;
        Some(self.directory.join(key))
    }

    async fn ensure_directory(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: self.directory.clone(),
                source: e,
            })
    }
}

#[async_trait]
impl ObjectStorage for FilesystemStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        self.ensure_directory().await?;

        let path = self.directory.join(key);

        // create_new: an existing object is never overwritten
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::ObjectExists(key.to_string()));
            }
            Err(e) => return Err(StorageError::WriteObject { path, source: e }),
        };

        file.write_all(&bytes)
            .await
            .map_err(|e| StorageError::WriteObject {
                path: path.clone(),
                source: e,
            })?;
        file.flush().await.map_err(|e| StorageError::WriteObject {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(key, content_type, size = bytes.len(), "Object stored");

        Ok(self.url_for(key))
    }
}
