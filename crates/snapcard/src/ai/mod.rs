//! Vision-language model access.
//!
//! [`VisionModel`] is the seam the pipeline talks to; [`GeminiClient`] is the
//! production implementation. Output sanitization and strict parsing live in
//! [`parse`].

pub mod client;
pub mod gemini;
pub mod parse;
pub mod schema;

pub use client::{GenerationRequest, ModelError, ModelOutput, VisionModel};
pub use gemini::GeminiClient;
pub use parse::{parse_analysis, strip_code_fences, ParseError};
pub use schema::card_response_schema;
