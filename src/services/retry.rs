//! Retry for read-only JSON-RPC calls
//!
//! Transient failures are retried on a capped exponential schedule with
//! jitter. A rate-limited endpoint skips straight to the cap. Transaction
//! sends never come through here; a failed write is retried by the next
//! tick re-deriving its decision from chain state.

use super::rpc_errors::ChainError;
use rand::Rng;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier
    pub backoff_factor: f64,
    /// Fraction of each delay that is randomized away (0.0 = none, 1.0 = full jitter)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 250,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
            jitter: 0.2,
        }
    }
}

/// Delay schedule for one retried operation
#[derive(Debug)]
struct Backoff<'a> {
    config: &'a RetryConfig,
    next_ms: u64,
}

impl<'a> Backoff<'a> {
    fn new(config: &'a RetryConfig) -> Self {
        Self {
            config,
            next_ms: config.initial_delay_ms.min(config.max_delay_ms),
        }
    }

    /// Delay before the next attempt, given the error that just happened
    fn delay_after<R: Rng + ?Sized>(&mut self, err: &ChainError, rng: &mut R) -> Duration {
        let base = if err.is_rate_limited() {
            self.config.max_delay_ms
        } else {
            self.next_ms
        };
        let grown = (self.next_ms as f64 * self.config.backoff_factor) as u64;
        self.next_ms = grown.min(self.config.max_delay_ms);

        let jitter = self.config.jitter.clamp(0.0, 1.0);
        let shaved = (base as f64 * jitter * rng.gen::<f64>()) as u64;
        Duration::from_millis(base - shaved.min(base))
    }
}

/// Run `f` until it succeeds, fails permanently, or runs out of retries.
///
/// Only errors with [`ChainError::is_transient`] are retried.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let mut backoff = Backoff::new(config);
    let mut retries = 0;

    loop {
        let err = match f().await {
            Ok(result) => return Ok(result),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => err,
        };

        if retries == config.max_retries {
            warn!("[Retry] {} gave up after {} attempts: {}", operation_name, retries + 1, err);
            return Err(err);
        }
        retries += 1;

        // ThreadRng is !Send; draw before awaiting
        let delay = backoff.delay_after(&err, &mut rand::thread_rng());
        debug!(
            "[Retry] {} failed ({}), retry {}/{} in {}ms",
            operation_name,
            err,
            retries,
            config.max_retries,
            delay.as_millis()
        );
        sleep(delay).await;
    }
}
