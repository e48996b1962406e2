use thiserror::Error;

use crate::error::Severity;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("Missing API key. Set CODEGRAPH_LLM_API_KEY or AZURE_OPENAI_API_KEY.")]
    MissingApiKey,

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited. Try again later.")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl LLMError {
    /// Setup problems are fatal; a failed call is not.
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingApiKey | Self::MissingConfig(_) | Self::UnknownProvider(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::Network(err.to_string())
    }
}
