//! Retry wrapper adding bounded exponential backoff to any chat provider.
//!
//! Replaces fixed inter-call sleeps: backoff only triggers on the service's
//! actual transient failure signals (rate limit, timeout, 5xx).

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::time::sleep;

use crate::chat::{ChatMessage, ChatProvider, GenerationParams};
use crate::error::SweepError;

const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 200;
const DEFAULT_MAX_DELAY_MS: u64 = 2_000;

/// Configuration for retry and backoff behavior.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first one
    pub max_attempts: usize,
    /// Initial backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Whether to add random jitter to backoff delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter: true,
        }
    }
}

/// Resilient wrapper that retries transient failures using exponential backoff.
pub struct Resilient<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: ChatProvider> Resilient<P> {
    /// Creates a new resilient wrapper around an existing provider.
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn backoff_sleep(&self, attempt_index: usize) {
        let mut delay = self
            .policy
            .base_delay_ms
            .saturating_mul(1u64 << attempt_index.min(16));
        delay = delay.min(self.policy.max_delay_ms);
        if self.policy.jitter {
            let span = (delay / 2).max(1);
            delay = delay.saturating_sub(rand::thread_rng().gen_range(0..span));
        }
        sleep(Duration::from_millis(delay)).await;
    }
}

#[async_trait]
impl<P: ChatProvider> ChatProvider for Resilient<P> {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, SweepError> {
        let mut attempts_left = self.policy.max_attempts;
        let mut idx = 0usize;
        let mut last_err: Option<SweepError> = None;

        while attempts_left > 0 {
            match self.inner.chat(messages, params).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if attempts_left == 1 {
                        return Err(SweepError::RetryExceeded {
                            attempts: self.policy.max_attempts,
                            last_error: err.to_string(),
                        });
                    }
                    log::warn!(
                        "transient failure (attempt {} of {}): {err}",
                        idx + 1,
                        self.policy.max_attempts
                    );
                    last_err = Some(err);
                    self.backoff_sleep(idx).await;
                    attempts_left -= 1;
                    idx += 1;
                }
            }
        }

        Err(SweepError::RetryExceeded {
            attempts: self.policy.max_attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct FlakyProvider {
        calls: Arc<AtomicUsize>,
        failures_before_success: usize,
        error: fn() -> SweepError,
    }

    #[async_trait]
    impl ChatProvider for FlakyProvider {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<String, SweepError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Err((self.error)())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
        }
    }

    fn params() -> GenerationParams {
        GenerationParams::new("m", 0.0, 16)
    }

    #[tokio::test]
    async fn recovers_from_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Resilient::new(
            FlakyProvider {
                calls: calls.clone(),
                failures_before_success: 2,
                error: || SweepError::RateLimited("429".into()),
            },
            fast_policy(3),
        );
        let text = provider.chat(&[], &params()).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_into_retry_exceeded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Resilient::new(
            FlakyProvider {
                calls: calls.clone(),
                failures_before_success: usize::MAX,
                error: || SweepError::Timeout("deadline".into()),
            },
            fast_policy(3),
        );
        let err = provider.chat(&[], &params()).await.unwrap_err();
        assert!(matches!(
            err,
            SweepError::RetryExceeded { attempts: 3, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Resilient::new(
            FlakyProvider {
                calls: calls.clone(),
                failures_before_success: usize::MAX,
                error: || SweepError::Auth("bad key".into()),
            },
            fast_policy(5),
        );
        let err = provider.chat(&[], &params()).await.unwrap_err();
        assert!(matches!(err, SweepError::Auth(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
