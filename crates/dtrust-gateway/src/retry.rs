//! Retry with exponential backoff for outbound HTTP calls.
//!
//! Only transport errors (connection refused, reset, timeout) are retried.
//! Status codes are the caller's concern. Non-idempotent POSTs must carry an
//! idempotency key before they are routed through here.

use std::time::Duration;

/// Retry attempts after the initial request.
const MAX_RETRIES: u32 = 3;

/// Base delay; doubles each attempt (200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

/// Send with retry on transport failure. `f` runs at most
/// `MAX_RETRIES + 1` times.
pub(crate) async fn retry_send<F, Fut>(
    operation: &'static str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "outbound request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    f().await
}
