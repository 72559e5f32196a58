use async_trait::async_trait;
use rand::Rng;
use tokio::time::{sleep, Duration};

use super::{DatasetSource, LoadError};
use crate::logging::log_load_retry;

/// Retry configuration. `max_retries == 0` means a single attempt.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Calculate delay with exponential backoff and jitter
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);

        // Add jitter: ±jitter_factor of the delay
        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let final_delay = (clamped + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

/// Wraps a source and retries retryable failures with exponential backoff.
pub struct RetryingSource<S> {
    inner: S,
    config: RetryConfig,
}

impl<S> RetryingSource<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<S: DatasetSource> DatasetSource for RetryingSource<S> {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(path).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.delay_for_attempt(attempt);
                    log_load_retry(
                        path,
                        attempt + 1,
                        self.config.max_retries + 1,
                        &e.to_string(),
                        delay.as_millis() as u64,
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} (retries={})", self.inner.describe(), self.config.max_retries)
    }
}
