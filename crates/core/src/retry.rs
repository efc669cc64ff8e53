//! Retry with exponential backoff and jitter
//!
//! Storage clients wrap idempotent calls in [`retry_with_backoff`]. The filesystem
//! adapter itself never retries.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Run `operation` until it succeeds, fails permanently, or attempts run out
///
/// # Example
/// ```ignore
/// let head = retry_with_backoff(
///     &config,
///     move || async move { client.head(container, key).await },
///     is_retryable_error,
/// ).await?;
/// ```
pub async fn retry_with_backoff<T, F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
    is_retryable: R,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    R: Fn(&Error) -> bool,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if attempt >= config.max_attempts || !is_retryable(&err) {
            return Err(err);
        }

        let backoff = backoff_for(config, attempt);
        tracing::debug!(
            attempt,
            backoff_ms = backoff.as_millis(),
            error = %err,
            "retrying storage call"
        );
        tokio::time::sleep(backoff).await;
    }
}

/// Delay before the attempt that follows `attempt`
///
/// The ceiling doubles from `initial_backoff_ms` per attempt up to
/// `max_backoff_ms`; the delay is drawn from the upper half of it.
fn backoff_for(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let ceiling = config
        .initial_backoff_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_backoff_ms);
    let floor = ceiling / 2;
    Duration::from_millis(floor + jitter(ceiling - floor))
}

/// Uniform-ish value in `0..=max`
fn jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    // Each RandomState is freshly keyed, so its hash of a fixed input is random
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(max);
    hasher.finish() % (max + 1)
}

/// Whether an error is transient and worth another attempt
///
/// Decided by the error kind, never by message text.
pub fn is_retryable_error(error: &Error) -> bool {
    error.is_transient()
}
