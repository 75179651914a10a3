//! Builders for model replies and configuration used across tests.

#![allow(dead_code)]

use serde_json::{json, Value};

/// Ten bytes that start like a JPEG. Enough for every stage that does not
/// decode pixels.
pub const FAKE_JPEG: [u8; 10] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// `FAKE_JPEG` in standard base64.
pub const FAKE_JPEG_BASE64: &str = "/9j/4AAQSkZJRg==";

/// Builder for one card in a model reply.
pub struct CardBuilder {
    card_type: String,
    title: String,
    summary: String,
    content: String,
    tags: Vec<String>,
    color: String,
}

impl CardBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            card_type: "CONCEPT".to_string(),
            title: title.to_string(),
            summary: format!("{} in one sentence", title),
            content: String::new(),
            tags: vec![],
            color: "#F5F5F5".to_string(),
        }
    }

    pub fn card_type(mut self, card_type: &str) -> Self {
        self.card_type = card_type.to_string();
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn build(self) -> Value {
        json!({
            "type": self.card_type,
            "title": self.title,
            "summary": self.summary,
            "content": self.content,
            "tags": self.tags,
            "color": self.color,
        })
    }
}

/// Serializes cards into the model's JSON reply, optionally wrapped in a
/// markdown code fence the way models often answer.
pub fn model_reply(cards: Vec<Value>, fenced: bool) -> String {
    let body = json!({ "cards": cards }).to_string();
    if fenced {
        format!("```json\n{}\n```", body)
    } else {
        body
    }
}

/// Builder for config files.
pub struct ConfigBuilder {
    value: Value,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            value: json!({ "version": "1.0" }),
        }
    }

    /// Sets `section.key` to `value`.
    pub fn set(mut self, section: &str, key: &str, value: Value) -> Self {
        let root = self
            .value
            .as_object_mut()
            .expect("config root is an object");
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| json!({}));
        entry
            .as_object_mut()
            .expect("config section is an object")
            .insert(key.to_string(), value);
        self
    }

    pub fn database_path(self, path: &str) -> Self {
        self.set("database", "path", json!(path))
    }

    pub fn storage_directory(self, path: &str) -> Self {
        self.set("storage", "directory", json!(path))
    }

    pub fn default_strategy(self, id: &str) -> Self {
        self.set("processing", "defaultStrategy", json!(id))
    }

    pub fn sweep_batch_size(self, size: i64) -> Self {
        self.set("sweep", "batchSize", json!(size))
    }

    pub fn build(self) -> String {
        serde_json::to_string_pretty(&self.value).expect("config serializes")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
