use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::config::{SummaryConfig, DEFAULT_SUMMARY_SYSTEM_PROMPT, DEFAULT_SUMMARY_USER_PROMPT};
use crate::llm::{complete_with_retry, LLMError, RetryPolicy, LLM};

use super::{HeuristicSummarizer, SummaryError, SummaryGenerator, SummaryRequest};

/// Summaries from a chat model, falling back to [`HeuristicSummarizer`] when
/// a call fails or keeps getting rate limited.
pub struct LlmSummarizer<L: LLM> {
    llm: L,
    max_words: usize,
    concurrency: usize,
    policy: RetryPolicy,
    fallback: HeuristicSummarizer,
}

impl<L: LLM> LlmSummarizer<L> {
    pub fn new(llm: L, config: &SummaryConfig) -> Self {
        Self {
            llm,
            max_words: config.max_words,
            concurrency: config.concurrency.max(1),
            policy: RetryPolicy::from(config),
            fallback: HeuristicSummarizer::new(config.max_words),
        }
    }

    async fn summarize_one(&self, request: SummaryRequest) -> Result<(String, String), SummaryError> {
        let max_words = self.max_words.to_string();
        let system = DEFAULT_SUMMARY_SYSTEM_PROMPT.replace("{max_words}", &max_words);
        let prompt = DEFAULT_SUMMARY_USER_PROMPT
            .replace("{max_words}", &max_words)
            .replace("{docstring}", &request.text);

        let summary = match complete_with_retry(&self.llm, &system, &prompt, &self.policy).await {
            Ok(text) if !text.trim().is_empty() => clean_response(&text),
            Ok(_) => self.fallback.summarize(&request.text),
            Err(e) if e.severity().is_fatal() => return Err(e.into()),
            Err(e) => {
                log_fallback(&request.key, &e);
                self.fallback.summarize(&request.text)
            }
        };
        Ok((request.key, summary))
    }
}

fn log_fallback(key: &str, error: &LLMError) {
    match error {
        LLMError::RateLimited => {
            tracing::warn!(key, "Max retries exceeded. Using fallback summarization.")
        }
        other => tracing::warn!(key, error = %other, "Summary request failed. Using fallback summarization."),
    }
}

fn clean_response(text: &str) -> String {
    text.trim().trim_matches('"').trim().to_string()
}

#[async_trait]
impl<L: LLM> SummaryGenerator for LlmSummarizer<L> {
    async fn summarize_batch(
        &self,
        requests: Vec<SummaryRequest>,
    ) -> Result<HashMap<String, String>, SummaryError> {
        let total = requests.len();
        tracing::info!(total, concurrency = self.concurrency, "Generating summaries");

        let results: HashMap<String, String> = stream::iter(requests)
            .map(|r| self.summarize_one(r))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        tracing::debug!(done = results.len(), "Summaries complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the docstring back, failing on demand.
    struct Echo {
        fail_on: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LLM for Echo {
        async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
            self.complete_with_system("", prompt).await
        }

        async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let doc = prompt.rsplit("\n\n").next().unwrap_or_default();
            if self.fail_on.is_some_and(|f| doc.contains(f)) {
                return Err(LLMError::ApiError {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(format!("\"summary of {}\"", doc))
        }
    }

    fn config() -> SummaryConfig {
        SummaryConfig {
            min_interval_ms: 0,
            backoff_factor: 0.001,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_results_keyed_by_request() {
        let llm = Echo {
            fail_on: None,
            calls: AtomicUsize::new(0),
        };
        let summarizer = LlmSummarizer::new(llm, &config());
        let out = summarizer
            .summarize_batch(vec![
                SummaryRequest::new("n1", "alpha"),
                SummaryRequest::new("n2", "beta"),
                SummaryRequest::new("n3", "gamma"),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out["n1"], "summary of alpha");
        assert_eq!(out["n2"], "summary of beta");
        assert_eq!(out["n3"], "summary of gamma");
    }

    #[tokio::test]
    async fn test_failed_call_falls_back() {
        let llm = Echo {
            fail_on: Some("Broken"),
            calls: AtomicUsize::new(0),
        };
        let summarizer = LlmSummarizer::new(llm, &config());
        let out = summarizer
            .summarize_batch(vec![
                SummaryRequest::new("ok", "Works fine."),
                SummaryRequest::new("bad", "Broken thing. More text."),
            ])
            .await
            .unwrap();

        assert_eq!(out["ok"], "summary of Works fine.");
        assert_eq!(out["bad"], "Broken thing");
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_batch() {
        struct Unconfigured;

        #[async_trait]
        impl LLM for Unconfigured {
            async fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
                Err(LLMError::MissingApiKey)
            }

            async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LLMError> {
                Err(LLMError::MissingApiKey)
            }
        }

        let summarizer = LlmSummarizer::new(Unconfigured, &config());
        let err = summarizer
            .summarize_batch(vec![SummaryRequest::new("k", "text")])
            .await
            .unwrap_err();
        assert!(err.severity().is_fatal());
    }
}
