//! Sanitization and strict parsing of model output.

use thiserror::Error;

use crate::record::AnalysisResult;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Model returned empty output")]
    Empty,

    #[error("Model output is not a valid card list: {0}")]
    Invalid(String),
}

/// Removes a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
///
/// Only a fence that opens the reply is stripped. Fences inside the payload,
/// such as code blocks in card content, are left alone.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = after_open.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Strips fences and deserializes into an [`AnalysisResult`].
///
/// Every card must carry all fields with the right types; a missing `cards`
/// key is a failure rather than an empty result.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, ParseError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(ParseError::Empty);
    }
    serde_json::from_str(body).map_err(|e| ParseError::Invalid(e.to_string()))
}
