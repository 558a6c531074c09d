//! Retry with exponential back-off and jitter for the Sprout client.
//!
//! Timeouts, connection failures, 429 and 5xx responses are retried. Every
//! other error is returned on first sight.

use std::future::Future;
use std::time::Duration;

use crate::error::SproutError;

pub(crate) fn is_retriable(err: &SproutError) -> bool {
    match err {
        SproutError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status().is_some_and(|s| {
                    s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS
                })
        }
        SproutError::Deserialize { .. } | SproutError::InvalidConfig(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// | Attempt | Sleep before next attempt       |
/// |---------|---------------------------------|
/// | 1       | base × 2⁰ ± 25 % jitter         |
/// | 2       | base × 2¹ ± 25 % jitter         |
/// | 3       | base × 2² ± 25 % jitter         |
///
/// Delay is capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SproutError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SproutError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retriable(&err) && attempt < max_retries => {
                attempt += 1;
                let delay = jittered_delay(backoff_base_ms, attempt, rand::random::<f64>());
                tracing::warn!(
                    label,
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Sprout transient error; retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `base × 2^(attempt-1)` capped at 60 s, scaled into ±25 % by `unit`
/// (a sample from `[0, 1)`).
fn jittered_delay(backoff_base_ms: u64, attempt: u32, unit: f64) -> Duration {
    const DELAY_CAP_MS: u64 = 60_000;
    let exponent = attempt.saturating_sub(1).min(10);
    let capped = backoff_base_ms
        .saturating_mul(1u64 << exponent)
        .min(DELAY_CAP_MS);
    Duration::from_millis(capped).mul_f64(0.75 + unit.clamp(0.0, 1.0) * 0.5)
}
