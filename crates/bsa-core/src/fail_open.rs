//! Fail-open utilities for graceful degradation
//!
//! The pipeline favors availability: image generation, logo lookups and
//! session autosave must never halt a run. Wrap those calls here so a failure
//! is logged via `tracing::warn!` and turned into `None`.
//!
//! DO NOT use fail-open for artifacts a downstream stage depends on. Those
//! stages carry their own explicit fallback artifact instead.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error on failure and returns `None`.
///
/// ```no_run
/// use bsa_core::fail_open::fail_open;
/// use bsa_core::Result;
///
/// async fn autosave() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let saved = fail_open("session_autosave", || autosave()).await;
///     // saved is None if autosave() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Like `fail_open` but with linear backoff retries
///
/// Runs the operation up to `max_attempts` times, waiting `100ms * attempt`
/// between attempts.
pub async fn fail_open_with_retries<F, Fut, T>(
    operation_name: &str,
    mut f: F,
    max_attempts: usize,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=max_attempts {
        match f().await {
            Ok(val) => return Some(val),
            Err(e) => {
                if attempt == max_attempts {
                    warn!(
                        "{} failed after {} attempts (fail-open): {}",
                        operation_name, max_attempts, e
                    );
                    return None;
                }
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name, attempt, max_attempts, e
                );
                let delay_ms = 100 * attempt as u64;
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }
        }
    }
    None
}
