use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::prompts;

pub const DEFAULT_STRATEGY_ID: &str = "v1-baseline";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Strategy not found: {0}")]
    NotFound(String),
}

/// A named, versioned bundle of model, prompt and tool flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub model_id: String,
    pub use_external_search_tool: bool,
    #[serde(skip_serializing)]
    pub prompt_text: String,
}

/// Immutable catalog of strategies keyed by id.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Strategy>,
    default_id: String,
}

impl StrategyRegistry {
    /// Registry with the built-in strategies and `v1-baseline` as default.
    pub fn builtin() -> Self {
        let strategies = [
            Strategy {
                id: "v1-baseline".into(),
                display_name: "Baseline v1.0".into(),
                description: "Short extraction prompt without web search".into(),
                model_id: "gemini-2.5-flash".into(),
                use_external_search_tool: false,
                prompt_text: prompts::BASELINE_PROMPT.into(),
            },
            Strategy {
                id: "v2-with-search".into(),
                display_name: "v2.0 with Google Search".into(),
                description: "Search-grounded prompt that forbids fabricated links".into(),
                model_id: "gemini-2.5-flash".into(),
                use_external_search_tool: true,
                prompt_text: prompts::SEARCH_GROUNDED_PROMPT.into(),
            },
        ]
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

        Self {
            strategies,
            default_id: DEFAULT_STRATEGY_ID.to_string(),
        }
    }

    /// Builtin registry with a different default. Fails if `default_id` is
    /// not a known strategy.
    pub fn with_default(default_id: &str) -> Result<Self, StrategyError> {
        let mut registry = Self::builtin();
        if !registry.strategies.contains_key(default_id) {
            return Err(StrategyError::NotFound(default_id.to_string()));
        }
        registry.default_id = default_id.to_string();
        Ok(registry)
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Resolves an explicit key, or the default when `key` is `None`.
    ///
    /// A blank key counts as absent.
    pub fn resolve(&self, key: Option<&str>) -> Result<&Strategy, StrategyError> {
        let id = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(self.default_id.as_str());
        self.strategies
            .get(id)
            .ok_or_else(|| StrategyError::NotFound(id.to_string()))
    }

    /// All strategies ordered by id.
    pub fn list(&self) -> Vec<&Strategy> {
        self.strategies.values().collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
