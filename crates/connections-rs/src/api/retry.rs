//! Retry with exponential backoff for the chat API.
//!
//! Only transport-level failures are retried: HTTP 429 and 5xx, dropped
//! connections, timeouts. A reply that arrives but cannot be parsed into a
//! guess is never retried here. That is a malformed oracle response and
//! aborts the run.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff policy: `initial_delay * 2^attempt`, capped at `max_delay`, then
/// scaled down by a random factor in `[1 - jitter_factor, 1]`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = fail on the first error).
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Down-jitter fraction; 0.25 means up to 25% shorter.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
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

    /// Delay before retry number `attempt` (0 before the first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = 1.0 - rand::random::<f64>() * self.jitter_factor.clamp(0.0, 1.0);
        Duration::from_secs_f64(capped * jitter)
    }
}

/// Whether an error from [`OpenRouterClient::chat`](crate::OpenRouterClient::chat)
/// is worth another attempt.
pub fn is_retryable(error: &str) -> bool {
    const PERMANENT: [&str; 6] = [
        "HTTP 400",
        "HTTP 401",
        "HTTP 403",
        "HTTP 404",
        "HTTP 422",
        "malformed oracle response",
    ];
    const TRANSIENT_STATUS: [&str; 5] = [
        "HTTP 429", "HTTP 500", "HTTP 502", "HTTP 503", "HTTP 504",
    ];
    const TRANSIENT_TRANSPORT: [&str; 6] = [
        "request failed:",
        "connection reset",
        "connection refused",
        "timed out",
        "timeout",
        "broken pipe",
    ];

    if PERMANENT.iter().any(|p| error.contains(p)) {
        return false;
    }
    if TRANSIENT_STATUS.iter().any(|s| error.contains(s)) {
        return true;
    }
    let lower = error.to_lowercase();
    TRANSIENT_TRANSPORT.iter().any(|p| lower.contains(p))
}

/// Run `call`, retrying retryable errors with backoff. Returns the last
/// error once retries run out.
pub async fn retry_api_call<T, F, Fut>(config: &RetryConfig, mut call: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut attempt = 0;
    loop {
        let err = match call().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if attempt >= config.max_retries || !is_retryable(&err) {
            return Err(err);
        }
        let delay = config.delay_for_attempt(attempt);
        attempt += 1;
        warn!(
            attempt,
            max = config.max_retries,
            "API call failed, retrying in {delay:?}: {err}"
        );
        tokio::time::sleep(delay).await;
    }
}
