//! Exponential backoff for transient VCS failures.

use crate::VcsResult;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Configuration that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// Only errors reporting `is_transient()` are retried; everything else is
/// returned on first occurrence.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, what: &str, operation: F) -> VcsResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = VcsResult<T>>,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if error.is_transient() && attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    operation = what,
                    attempt,
                    max_retries = config.max_retries,
                    error = %error,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(
                    Duration::from_millis((delay.as_millis() as f64 * config.multiplier) as u64),
                    config.max_delay,
                );
            },
            Err(error) => return Err(error),
        }
    }
}
