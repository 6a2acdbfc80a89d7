//! Bounded retry for transient upstream failures.
//!
//! Shared by the remote embedding client, the vector store HTTP fallback
//! path, and the bitmagnet GraphQL client: up to 3 attempts, linear backoff
//! (`0.3 * attempt` seconds), retrying only on the transient HTTP status set
//! {502, 503, 504}.

use std::time::Duration;

/// Transient HTTP statuses worth retrying.
pub const TRANSIENT_STATUSES: [u16; 3] = [502, 503, 504];

/// Maximum retry attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 3;

/// Returns true if `status` is in the transient retry set.
pub fn is_transient(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

/// Run `f` up to [`MAX_ATTEMPTS`] times. `f` returns `Ok` on success, or
/// `Err((status, error))` where `status` is `None` for non-HTTP failures
/// (never retried) or `Some(code)` for HTTP failures (retried only if
/// [`is_transient`]). Sleeps `0.3 * attempt` seconds between attempts.
pub async fn with_bounded_retry<T, E, F, Fut>(mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, (Option<u16>, E)>>,
{
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err((status, err)) => {
                let retryable = status.is_some_and(is_transient);
                if !retryable || attempt >= MAX_ATTEMPTS {
                    return Err(err);
                }
                tokio::time::sleep(Duration::from_millis(300 * u64::from(attempt))).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = with_bounded_retry(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err((Some(503), "unavailable"))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = with_bounded_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err((Some(404), "not found"))
        })
        .await;
        assert_eq!(result, Err("not found"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
