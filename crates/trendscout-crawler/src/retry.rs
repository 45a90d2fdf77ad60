//! Retry with exponential backoff for session launches.
//!
//! Only failures a fresh identity could fix (browser init, proxy) are retried;
//! everything else is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use trendscout_browser::CancellationToken;

use crate::error::PlatformSearchError;

/// Runs `operation` up to `max_attempts` times in total.
///
/// Between attempts sleeps `backoff_base * 2^(attempt - 1)`. Cancellation
/// during a backoff returns [`PlatformSearchError::Cancelled`].
///
/// # Errors
///
/// Returns the first non-retriable error, or the last error once attempts are
/// exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base: Duration,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, PlatformSearchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, PlatformSearchError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retriable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = backoff_base.saturating_mul(1u32 << (attempt - 1).min(16));
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "retriable launch failure; retrying with a fresh identity"
        );
        tokio::select! {
            () = cancel.cancelled() => return Err(PlatformSearchError::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
