//! Post-hoc verification of links in model output.
//!
//! The model is the only untrusted producer in the pipeline; any URL it emits
//! may be fabricated. Verification is diagnostic and never mutates records.

pub mod extract;
pub mod verifier;

pub use extract::{extract_urls, result_urls};
pub use verifier::{
    retain_verified_cards, InvalidUrl, LinkVerifier, VerificationReport, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_PROBE_TIMEOUT,
};
