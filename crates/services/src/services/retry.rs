use std::{future::Future, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

/// Connection-level failures and SQLite lock contention clear up on their own.
pub(crate) fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        // SQLITE_BUSY, SQLITE_LOCKED and their extended codes
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("5" | "6" | "261" | "262" | "517")),
        _ => false,
    }
}

/// Runs a read, retrying transient failures with exponential backoff.
pub(crate) async fn read_with_retry<T, F, Fut>(operation: &'static str, read: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    read.retry(
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(50))
            .with_max_delay(Duration::from_secs(1))
            .with_max_times(3)
            .with_jitter(),
    )
    .when(is_transient)
    .notify(|e, dur| {
        warn!(
            operation,
            "Transient database error, retrying after {:.2}s: {}",
            dur.as_secs_f64(),
            e
        )
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let attempts = AtomicU32::new(0);
        let value = read_with_retry("test", || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(sqlx::Error::PoolTimedOut)
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = read_with_retry("test", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(sqlx::Error::RowNotFound)
        })
        .await;
        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
