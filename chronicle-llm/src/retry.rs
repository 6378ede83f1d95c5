//! Bounded retry loop around one upstream attempt.
//!
//! Rate limits back off exponentially (2s, 4s, ...). Any other retryable
//! failure waits a fixed second. Terminal failures leave immediately.

use std::future::Future;
use std::time::Duration;

use chronicle_core::{ChronicleError, ChronicleResult, LlmError};

/// Attempts per generation, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// BACKOFF STRATEGY
// ============================================================================

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BackoffStrategy {
    /// No backoff
    #[default]
    None,
    /// Fixed delay
    Fixed { delay_ms: u64 },
    /// Exponential backoff
    Exponential {
        base_ms: u64,
        multiplier: f64,
        max_ms: u64,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let millis = match self {
            BackoffStrategy::None => 0,
            BackoffStrategy::Fixed { delay_ms } => *delay_ms,
            BackoffStrategy::Exponential {
                base_ms,
                multiplier,
                max_ms,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = (*base_ms as f64) * multiplier.powi(exponent);
                if delay.is_finite() {
                    (delay as u64).min(*max_ms)
                } else {
                    *max_ms
                }
            }
        };
        Duration::from_millis(millis)
    }
}

// ============================================================================
// RETRY POLICY
// ============================================================================

/// Policy for retrying failed upstream calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Delay after a rate-limited attempt
    pub rate_limit_backoff: BackoffStrategy,
    /// Delay after any other retryable failure
    pub failure_backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_backoff: BackoffStrategy::Exponential {
                base_ms: 1_000,
                multiplier: 2.0,
                max_ms: 60_000,
            },
            failure_backoff: BackoffStrategy::Fixed { delay_ms: 1_000 },
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            rate_limit_backoff: BackoffStrategy::None,
            failure_backoff: BackoffStrategy::None,
        }
    }
}

// ============================================================================
// RETRY LOOP
// ============================================================================

/// Run `operation` until it succeeds or the policy gives up.
///
/// `operation` receives the 1-based attempt number. Attempts never overlap.
///
/// # Returns
/// * `Ok(T)` - The first successful attempt
/// * `Err(LlmError::RetriesExhausted)` - Every attempt was rate limited
/// * `Err(e)` - A terminal failure, or a non rate-limit failure in the last slot
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> ChronicleResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ChronicleResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    let mut last_rate_limit: Option<LlmError> = None;

    while attempt < max_attempts {
        tracing::debug!(attempt = attempt + 1, max_attempts, "Starting upstream attempt");

        match operation(attempt + 1).await {
            Ok(value) => return Ok(value),
            Err(ChronicleError::Llm(err @ LlmError::RateLimited { .. })) => {
                attempt += 1;
                if attempt < max_attempts {
                    let delay = policy.rate_limit_backoff.delay_for_attempt(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        cause = %err,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    tracing::warn!(attempt, cause = %err, "Rate limited on final attempt");
                }
                last_rate_limit = Some(err);
            }
            Err(err) if err.is_terminal() => {
                tracing::debug!(attempt = attempt + 1, cause = %err, "Terminal failure, not retrying");
                return Err(err);
            }
            Err(err) => {
                if attempt + 1 >= max_attempts {
                    tracing::warn!(attempt = attempt + 1, cause = %err, "Final attempt failed");
                    return Err(err);
                }
                attempt += 1;
                let delay = policy.failure_backoff.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    cause = %err,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(LlmError::RetriesExhausted {
        attempts: attempt,
        last_error: last_rate_limit.map(Box::new),
    }
    .into())
}
