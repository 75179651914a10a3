//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use super::client::{GenerationRequest, ModelError, ModelOutput, VisionModel};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<SecretString>,
}

impl GeminiClient {
    /// Builds a client. Without an API key every call fails with
    /// [`ModelError::MissingCredential`].
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ModelError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &GenerationRequest) -> Value {
        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": request.mime_type,
                            "data": BASE64.encode(&request.image),
                        }
                    },
                    { "text": request.prompt }
                ]
            }]
        });

        if request.use_search_tool {
            payload["tools"] = json!([{ "googleSearch": {} }]);
        }

        // The API rejects a response schema combined with tools.
        if let (Some(schema), false) = (&request.response_schema, request.use_search_tool) {
            payload["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }

        payload
    }

    fn extract_output(payload: &Value) -> ModelOutput {
        let Some(candidate) = payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
        else {
            return ModelOutput::default();
        };

        let text = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        let grounded = candidate
            .get("groundingMetadata")
            .and_then(Value::as_object)
            .is_some_and(|meta| !meta.is_empty());

        ModelOutput { text, grounded }
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| crate::sanitize::truncate_for_log(body, 200))
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<ModelOutput, ModelError> {
        let api_key = self.api_key.as_ref().ok_or(ModelError::MissingCredential)?;
        let endpoint = self.endpoint_for_model(&request.model_id);
        let payload = Self::build_payload(&request);

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| ModelError::InvalidResponse(format!("response is not JSON: {}", e)))?;

        Ok(Self::extract_output(&parsed))
    }
}
