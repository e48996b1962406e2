//! Batch summaries of function docstrings.
//!
//! Requests carry a caller-chosen key and results come back keyed by it, so
//! a generator is free to finish them in any order.

mod heuristic;
mod llm;

pub use heuristic::HeuristicSummarizer;
pub use llm::LlmSummarizer;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Severity;
use crate::llm::LLMError;

/// One docstring to summarize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub key: String,
    pub text: String,
}

impl SummaryRequest {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Summary generation errors.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),
}

impl SummaryError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Llm(e) => e.severity(),
        }
    }
}

/// Produces short summaries for a batch of docstrings.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Summarize every request. The returned map holds one entry per request
    /// key.
    async fn summarize_batch(
        &self,
        requests: Vec<SummaryRequest>,
    ) -> Result<HashMap<String, String>, SummaryError>;
}
