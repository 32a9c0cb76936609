//! Retry with exponential backoff for rate-limited generation calls
//!
//! The external service rejects bursts with HTTP 429. The wrapper retries
//! only that class of failure, doubling the delay each attempt; everything
//! else propagates to the caller unchanged, and so does a 429 once the
//! budget runs out.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Default retry budget for one image-generation call
pub const DEFAULT_RETRIES: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);

/// A failure counts as rate limited when the 429 status shows up anywhere in
/// its string form. Coarse, but it covers both our own `GenError::Api` and
/// errors bubbled up from the HTTP stack.
pub fn is_rate_limited(err: &impl Display) -> bool {
    err.to_string().contains("429")
}

/// Run `op`, retrying rate-limited failures up to `retries` times with the
/// delay doubling after each attempt. Budget exhaustion is a hard failure:
/// the last error is returned, never swallowed.
pub async fn with_backoff<T, E, F, Fut>(
    mut op: F,
    mut retries: u32,
    mut delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if retries > 0 && is_rate_limited(&err) => {
                warn!(
                    error = %err,
                    retries_left = retries,
                    delay_secs = delay.as_secs(),
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                retries -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn rate_limit_err() -> String {
        "API error: status 429: quota exceeded".to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn two_rate_limits_then_success_is_invisible_to_the_caller() {
        let attempts = AtomicU32::new(0);
        let result: Result<&str, String> = with_backoff(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(rate_limit_err())
                    } else {
                        Ok("image.png")
                    }
                }
            },
            DEFAULT_RETRIES,
            DEFAULT_INITIAL_DELAY,
        )
        .await;

        assert_eq!(result.unwrap(), "image.png");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_rate_limit_errors_propagate_on_the_first_attempt() {
        let attempts = AtomicU32::new(0);
        let result: Result<&str, String> = with_backoff(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("connection refused".to_string()) }
            },
            DEFAULT_RETRIES,
            DEFAULT_INITIAL_DELAY,
        )
        .await;

        assert_eq!(result.unwrap_err(), "connection refused");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_propagates_the_last_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<&str, String> = with_backoff(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limit_err()) }
            },
            3,
            Duration::from_secs(5),
        )
        .await;

        assert!(is_rate_limited(&result.unwrap_err()));
        // Initial attempt plus three retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn delays_double_between_retries() {
        let start = tokio::time::Instant::now();
        let attempts = AtomicU32::new(0);
        let _: Result<&str, String> = with_backoff(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limit_err()) }
            },
            2,
            Duration::from_secs(5),
        )
        .await;

        // 5s after the first failure, 10s after the second
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }
}
