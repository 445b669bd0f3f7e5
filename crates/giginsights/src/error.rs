//! Error taxonomy for the insights pipeline.
//!
//! Only [`InsightError::EmptyCorpus`] and [`InsightError::Validation`] ever
//! reach a caller. Completion failures and malformed model output are
//! recovered into fallbacks inside the pipeline and exist here so the
//! recovery sites can log a typed cause.

use std::fmt;

use thiserror::Error;

use crate::llm::CompletionError;

/// The two record collections served by the corpus store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Complaints,
    Policies,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Complaints => f.write_str("complaints"),
            Collection::Policies => f.write_str("policies"),
        }
    }
}

impl Collection {
    /// Client-facing message when this collection has no records.
    pub fn empty_message(&self) -> &'static str {
        match self {
            Collection::Complaints => "No complaints found.",
            Collection::Policies => "No policy found.",
        }
    }
}

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("{}", .0.empty_message())]
    EmptyCorpus(Collection),

    #[error("{0}")]
    Validation(String),

    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}

pub type InsightResult<T> = std::result::Result<T, InsightError>;
