//! Chat completion clients.
//!
//! Summaries and search explanations both go through the [`LLM`] trait so
//! tests can swap in a stub and the provider can change with configuration.

mod error;
mod openai;
mod provider;
mod retry;

pub use error::LLMError;
pub use openai::OpenAIClient;
pub use provider::{GenerationParams, Provider};
pub use retry::{complete_with_retry, RetryPolicy};

use async_trait::async_trait;

/// Trait for Large Language Model providers.
///
/// # Supported Providers
///
/// - **OpenAI-compatible** (default): OpenAI, vLLM, OpenRouter and friends
/// - **Azure OpenAI**: deployment URLs with an `api-key` header
/// - **Ollama**: local models via the OpenAI-compatible endpoint
///
/// # Example
///
/// ```ignore
/// use codegraph_core::llm::{Provider, LLM};
///
/// let llm = Provider::from_config(&config.llm).build()?;
/// let response = llm.complete("Hello!").await?;
/// ```
#[async_trait]
pub trait LLM: Send + Sync {
    /// Complete a prompt and return the response.
    async fn complete(&self, prompt: &str) -> Result<String, LLMError>;

    /// Complete a prompt with a system message.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError>;
}

/// Blanket implementation for boxed trait objects.
#[async_trait]
impl LLM for Box<dyn LLM> {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        (**self).complete(prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError> {
        (**self).complete_with_system(system, prompt).await
    }
}

#[async_trait]
impl<T: LLM + ?Sized> LLM for &T {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        (**self).complete(prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError> {
        (**self).complete_with_system(system, prompt).await
    }
}
