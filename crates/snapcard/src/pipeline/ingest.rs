use std::sync::Arc;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::record::PipelineRecord;
use crate::sanitize;
use crate::storage::{generate_object_key, ObjectStorage, IMAGE_CONTENT_TYPE};
use crate::store::RecordStore;
use crate::worker::Dispatcher;

use super::context::{DispatchOrigin, ProcessRequest};
use super::error::PipelineError;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Decodes a client-supplied base64 image.
///
/// Accepts an optional `data:<mime>;base64,` prefix, embedded whitespace,
/// padded or unpadded input, and the URL-safe alphabet as a fallback.
pub fn decode_image(input: &str) -> Result<Vec<u8>, PipelineError> {
    let trimmed = input.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| PipelineError::InvalidInput("malformed data URL".to_string()))?,
        None => trimmed,
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(PipelineError::InvalidInput("image is empty".to_string()));
    }

    let bytes = STANDARD_LENIENT
        .decode(&compact)
        .or_else(|_| URL_SAFE_LENIENT.decode(&compact))
        .map_err(|e| PipelineError::InvalidInput(format!("image is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(PipelineError::InvalidInput("image decoded to zero bytes".to_string()));
    }
    Ok(bytes)
}

/// Result of a successful ingestion.
#[derive(Debug)]
pub struct IngestReceipt {
    pub id: String,
    pub image_ref: String,
    /// Handle of the dispatched processing run, if one was started.
    pub dispatched: Option<JoinHandle<()>>,
}

/// The Ingestion Endpoint: archive the image, create an `uploaded` record and
/// dispatch processing without waiting for it.
pub struct Ingestor {
    storage: Arc<dyn ObjectStorage>,
    store: Arc<dyn RecordStore>,
    dispatcher: Dispatcher,
    default_source: String,
}

impl Ingestor {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        store: Arc<dyn RecordStore>,
        dispatcher: Dispatcher,
        default_source: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            store,
            dispatcher,
            default_source: default_source.into(),
        }
    }

    pub async fn ingest(
        &self,
        image: Option<&str>,
        source: Option<String>,
    ) -> Result<IngestReceipt, PipelineError> {
        let image = image
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| PipelineError::InvalidInput("missing image".to_string()))?;
        let bytes = decode_image(image)?;

        let key = generate_object_key();
        let image_ref = self
            .storage
            .put(&key, bytes, IMAGE_CONTENT_TYPE)
            .instrument(info_span!("store_image", key = %key))
            .await?;

        let source = source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.default_source.clone());
        let record = PipelineRecord::new_uploaded(image_ref.clone(), Some(source));

        // A failure here leaves the stored blob behind; orphans are harmless.
        self.store.create(&record).await?;

        info!(
            record_id = %record.id,
            source = %record.source,
            image = %sanitize::redact_image_ref(&image_ref),
            "Capture ingested"
        );

        let request = ProcessRequest::new(&record.id, &image_ref, DispatchOrigin::Ingest);
        let dispatched = self.dispatcher.dispatch(request);
        if dispatched.is_none() {
            warn!(record_id = %record.id, "Processing was not dispatched; the sweep will pick it up");
        }

        Ok(IngestReceipt {
            id: record.id,
            image_ref,
            dispatched,
        })
    }
}
