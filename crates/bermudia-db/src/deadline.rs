//! Deadlines for store calls.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// Await `call`, failing with [`StoreError::Timeout`] once `deadline`
/// elapses. The abandoned call is dropped; a change set that had not
/// committed is rolled back with its transaction.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(deadline, call).await.map_err(|elapsed| {
        tracing::warn!(?deadline, %elapsed, "Store call exceeded its deadline");
        StoreError::Timeout { after: deadline }
    })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let value = with_deadline(Duration::from_secs(1), async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(())
        };
        let err = with_deadline(Duration::from_millis(10), slow).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn inner_errors_are_kept() {
        let failing = async { Err::<(), _>(StoreError::Fenced) };
        let err = with_deadline(Duration::from_secs(1), failing).await.unwrap_err();
        assert!(matches!(err, StoreError::Fenced));
    }
}
