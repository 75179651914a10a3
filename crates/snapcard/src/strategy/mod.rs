//! Versioned analysis strategies (model + prompt + tool flags).

pub mod prompts;
pub mod registry;

pub use registry::{Strategy, StrategyError, StrategyRegistry, DEFAULT_STRATEGY_ID};
