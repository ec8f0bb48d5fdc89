//! Retry and deadline helpers for provider calls
//!
//! Only `ProviderError::Transient` consumes the retry budget. Fatal, not-found
//! and malformed responses return immediately so the gateway can move on to
//! the next backend.

use crate::errors::{BuildError, BuildResult, ProviderResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    pub initial_delay: Duration,
    /// 1.0 keeps the delay fixed
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            backoff_multiplier: 1.0,
            max_delay: delay,
        }
    }

    pub fn single_attempt() -> Self {
        Self::fixed(1, Duration::ZERO)
    }
}

/// `min(current * multiplier, max)`
///
/// ```
/// use std::time::Duration;
/// use data_carry_builder::provider::retry::calculate_next_backoff;
///
/// let next = calculate_next_backoff(Duration::from_millis(100), 2.0, Duration::from_secs(30));
/// assert_eq!(next, Duration::from_millis(200));
/// ```
pub fn calculate_next_backoff(current: Duration, multiplier: f64, max: Duration) -> Duration {
    Duration::from_millis((current.as_millis() as f64 * multiplier) as u64).min(max)
}

/// Run `call` under `policy`, retrying transient failures only
pub async fn retry_provider_call<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &str,
    operation: &str,
    mut call: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(
                    "{} {} attempt {}/{} failed: {}. Retrying in {:?}",
                    provider, operation, attempt, attempts, err, delay
                );
                tokio::time::sleep(delay).await;
                delay = calculate_next_backoff(delay, policy.backoff_multiplier, policy.max_delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Caller-level deadline around a whole fan-out
pub async fn with_deadline<T, Fut>(deadline: Duration, operation: &str, future: Fut) -> BuildResult<T>
where
    Fut: Future<Output = BuildResult<T>>,
{
    match timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} exceeded its {:?} deadline", operation, deadline);
            Err(BuildError::Timeout {
                timeout_seconds: deadline.as_secs(),
                operation: operation.to_string(),
            })
        }
    }
}
