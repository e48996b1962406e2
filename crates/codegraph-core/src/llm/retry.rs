//! Pacing and rate-limit retries around an [`LLM`].

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{SummaryConfig, MAX_RETRY_BACKOFF_SECS};

use super::{LLMError, LLM};

/// Retry and pacing settings for a sequence of calls.
#[derive(Debug)]
pub struct RetryPolicy {
    /// Retries after a rate-limit response.
    pub max_retries: u32,
    /// Retry `n` (from 1) waits `backoff_factor^n` seconds.
    pub backoff_factor: f64,
    /// Minimum time between the start of two calls.
    pub min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: f64, min_interval: Duration) -> Self {
        Self {
            max_retries,
            backoff_factor,
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// A single attempt without pacing.
    pub fn none() -> Self {
        Self::new(0, 1.0, Duration::ZERO)
    }

    /// `backoff_factor^retry` seconds, capped at [`MAX_RETRY_BACKOFF_SECS`].
    /// Negative or NaN waits are zero.
    fn backoff(&self, retry: u32) -> Duration {
        let cap = Duration::from_secs(MAX_RETRY_BACKOFF_SECS);
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.backoff_factor.powi(exponent);
        match Duration::try_from_secs_f64(secs) {
            Ok(wait) => wait.min(cap),
            Err(_) if secs > 0.0 => cap,
            Err(_) => Duration::ZERO,
        }
    }

    /// Wait until `min_interval` has passed since the previous call started.
    /// The lock is held while sleeping so concurrent callers queue up.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl From<&SummaryConfig> for RetryPolicy {
    fn from(config: &SummaryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.backoff_factor,
            Duration::from_millis(config.min_interval_ms),
        )
    }
}

/// Call `complete_with_system`, retrying rate-limited responses with
/// exponential backoff. Other errors are returned at once.
pub async fn complete_with_retry(
    llm: &dyn LLM,
    system: &str,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, LLMError> {
    let mut retry = 0;
    loop {
        policy.pace().await;
        match llm.complete_with_system(system, prompt).await {
            Err(LLMError::RateLimited) if retry < policy.max_retries => {
                retry += 1;
                let wait = policy.backoff(retry);
                tracing::warn!(
                    "Rate limited. Retrying in {:.2} seconds... (Attempt {}/{})",
                    wait.as_secs_f64(),
                    retry,
                    policy.max_retries
                );
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LLM for Flaky {
        async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
            self.complete_with_system("", prompt).await
        }

        async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LLMError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(LLMError::RateLimited)
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_retries_rate_limits() {
        let llm = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let policy = RetryPolicy::new(3, 0.001, Duration::ZERO);
        let out = complete_with_retry(&llm, "s", "p", &policy).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let llm = Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let policy = RetryPolicy::new(2, 0.001, Duration::ZERO);
        let err = complete_with_retry(&llm, "s", "p", &policy).await.unwrap_err();
        assert!(matches!(err, LLMError::RateLimited));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let cap = Duration::from_secs(MAX_RETRY_BACKOFF_SECS);
        assert_eq!(RetryPolicy::new(3, 2.0, Duration::ZERO).backoff(3), Duration::from_secs(8));
        assert_eq!(RetryPolicy::new(u32::MAX, 10.0, Duration::ZERO).backoff(400), cap);
        assert_eq!(RetryPolicy::new(1, f64::INFINITY, Duration::ZERO).backoff(1), cap);
        assert_eq!(RetryPolicy::new(1, f64::NAN, Duration::ZERO).backoff(1), Duration::ZERO);
        assert_eq!(RetryPolicy::new(1, -2.0, Duration::ZERO).backoff(1), Duration::ZERO);
        assert_eq!(RetryPolicy::new(1, 1e300, Duration::ZERO).backoff(u32::MAX), cap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_spaces_calls() {
        let policy = RetryPolicy::new(0, 1.0, Duration::from_secs(2));
        let start = Instant::now();
        policy.pace().await;
        policy.pace().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
