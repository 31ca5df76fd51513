//! Rate-limit-aware retry around a single generation call.
//!
//! Per record the controller moves through
//! `Attempting(a) → Success | RetryWait(a + 1) | TerminalError`.
//! Only throttling is retried; any other failure is terminal at once and
//! never consumes the remaining budget.

use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::config::RetryConfig;
use crate::providers::{FailureKind, TextGenerator};

use super::{EMPTY_RESPONSE_FALLBACK, GENERIC_FAILURE_MESSAGE, QUOTA_EXCEEDED_MESSAGE};

/// Exponential backoff policy for throttled calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each following one.
    pub base_backoff: Duration,
    /// Upper bound of the uniform jitter added to each wait.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_jitter: Duration::from_millis(config.jitter_ms),
        }
    }
}

impl RetryPolicy {
    /// Deterministic part of the wait after failed attempt `attempt`:
    /// `base_backoff * 2^attempt`, saturating.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }

    /// Full wait after failed attempt `attempt`, jitter included.
    pub fn wait_for(&self, attempt: u32) -> Duration {
        self.backoff_for(attempt).saturating_add(self.jitter())
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Outcome of one record's generation, after all retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted {
    /// Generated text, fallback text, or a terminal error message.
    pub text: String,
    /// Number of calls made to the generator.
    pub attempts: u32,
}

/// Generate text for `prompt`, backing off and retrying on throttling.
///
/// Never fails: terminal failures are reported as one of the fixed error
/// messages so that a single record can never abort a run.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator,
    prompt: &str,
    policy: &RetryPolicy,
    record_id: &str,
) -> Attempted {
    let mut attempt: u32 = 0;
    loop {
        let calls = attempt.saturating_add(1);
        let err = match generator.generate(prompt).await {
            Ok(text) if text.trim().is_empty() => {
                warn!(record_id, "generator returned empty text, using fallback");
                return Attempted {
                    text: EMPTY_RESPONSE_FALLBACK.to_owned(),
                    attempts: calls,
                };
            }
            Ok(text) => {
                return Attempted {
                    text,
                    attempts: calls,
                }
            }
            Err(err) => err,
        };

        match err.failure_kind() {
            FailureKind::RateLimited if attempt < policy.max_retries => {
                let wait = policy.wait_for(attempt);
                warn!(
                    record_id,
                    attempt = calls,
                    max_retries = policy.max_retries,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                attempt = calls;
            }
            FailureKind::RateLimited => {
                error!(record_id, attempts = calls, error = %err, "retry budget exhausted");
                return Attempted {
                    text: QUOTA_EXCEEDED_MESSAGE.to_owned(),
                    attempts: calls,
                };
            }
            FailureKind::Other => {
                error!(record_id, attempts = calls, error = %err, "generation failed");
                return Attempted {
                    text: GENERIC_FAILURE_MESSAGE.to_owned(),
                    attempts: calls,
                };
            }
        }
    }
}
