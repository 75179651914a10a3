//! Object storage for archived screenshots and image retrieval.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;

pub mod fetch;
pub mod filesystem;

pub use fetch::{FetchError, HttpImageFetcher, ImageFetcher, LocalFirstFetcher};
pub use filesystem::FilesystemStorage;

/// Content type every archived capture is written with.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Durable blob storage that hands back a public reference for each object.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Writes `bytes` under `key` and returns the object's public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;
}

/// Generates an object key of the form `<unix-millis>-<8 hex chars>.jpg`.
pub fn generate_object_key() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}.jpg", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Rejects keys that could escape the storage root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_generate_object_key_shape() {
        let pattern = Regex::new(r"^\d{13}-[0-9a-f]{8}\.jpg$").unwrap();
        let key = generate_object_key();
        assert!(pattern.is_match(&key), "unexpected key {key}");
        assert_ne!(generate_object_key(), generate_object_key());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("1700000000000-deadbeef.jpg").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b.jpg").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("").is_err());
    }
}
