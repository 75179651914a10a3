use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No API key configured for the vision model")]
    MissingCredential,

    #[error("Model request failed: {0}")]
    Transport(String),

    #[error("Model API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected model response: {0}")]
    InvalidResponse(String),
}

/// One multimodal generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model_id: String,
    pub prompt: String,
    pub image: Vec<u8>,
    pub mime_type: String,
    /// Enables the provider's web search grounding tool.
    pub use_search_tool: bool,
    /// JSON response schema. Must be `None` when the search tool is on.
    pub response_schema: Option<serde_json::Value>,
}

/// Raw model output before sanitization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOutput {
    pub text: String,
    /// Whether the provider reported search grounding for this answer.
    pub grounded: bool,
}

/// A generative vision-language model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<ModelOutput, ModelError>;
}
