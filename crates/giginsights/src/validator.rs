//! Validation and repair of raw model text.
//!
//! The model is not a trusted schema producer, so every path here is total:
//! any input yields a well-formed result, falling back to a fixed marker
//! value when the text cannot be used.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::InsightError;
use crate::types::{ConcernSummary, PolicySuggestionResult};

pub const SUMMARY_FALLBACK: &str = "Failed to generate a summary.";
pub const TRUNCATED_CONCERN: &str = "Error: OpenAI response was incomplete";
pub const ANALYSIS_FAILED_CONCERN: &str = "Failed to analyze data";

// Opening fences may carry a language tag (```json, ```JSON, ```text ...)
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("code fence regex is valid"));

/// Remove every Markdown code-fence delimiter and trim the result.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_RE.replace_all(text, "").trim().to_string()
}

/// Heuristic cut-off detector for array-shaped output.
///
/// A completion stopped by the token ceiling almost never ends exactly on the
/// closing bracket, so a missing trailing `]` is read as truncation. It does
/// not check bracket balance.
pub fn is_likely_truncated(text: &str) -> bool {
    !text.trim_end().ends_with(']')
}

/// Accept any non-empty completion as a summary.
pub fn accept_summary(raw: Option<String>) -> String {
    match raw.map(|s| s.trim().to_string()) {
        Some(text) if !text.is_empty() => text,
        _ => SUMMARY_FALLBACK.to_string(),
    }
}

/// Why analysis output could not be repaired.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("response does not end with ']' (ends with {tail:?})")]
    Truncated { tail: String },

    #[error("response is not a concern array: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<RepairError> for InsightError {
    fn from(e: RepairError) -> Self {
        InsightError::MalformedOutput(e.to_string())
    }
}

/// Strict concern-analysis repair pipeline: strip fences, reject truncated
/// text, then parse.
pub fn repair_concerns(raw: &str) -> Result<Vec<ConcernSummary>, RepairError> {
    let cleaned = strip_code_fences(raw);

    if is_likely_truncated(&cleaned) {
        return Err(RepairError::Truncated {
            tail: tail(&cleaned, 80),
        });
    }

    Ok(serde_json::from_str::<Vec<ConcernSummary>>(&cleaned)?)
}

/// Repair analysis output, substituting a single marker entry on failure.
///
/// `None` means the completion call itself failed.
pub fn concerns_or_fallback(raw: Option<&str>) -> Vec<ConcernSummary> {
    let Some(raw) = raw else {
        return analysis_failed();
    };

    match repair_concerns(raw) {
        Ok(concerns) => concerns,
        Err(RepairError::Truncated { tail }) => {
            tracing::warn!(tail = %tail, "Analysis response looks truncated, returning placeholder");
            vec![ConcernSummary::new(TRUNCATED_CONCERN, 0)]
        }
        Err(e) => {
            tracing::warn!(error = %InsightError::from(e), "Could not parse analysis response");
            analysis_failed()
        }
    }
}

fn analysis_failed() -> Vec<ConcernSummary> {
    vec![ConcernSummary::new(ANALYSIS_FAILED_CONCERN, 0)]
}

/// Best-effort parse of policy suggestions.
///
/// Used for diagnostics only; the suggestion payload served to clients is
/// the model's raw text.
pub fn parse_policy_suggestions(raw: &str) -> Option<PolicySuggestionResult> {
    serde_json::from_str(&strip_code_fences(raw)).ok()
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max_chars)).collect()
}
