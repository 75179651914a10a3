//! Shared test utilities for snapcard integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with a temp image directory, an
//!   in-memory record store and a scripted vision model
//! - Builders for model replies and config files

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ScriptedModel, TestHarness};
