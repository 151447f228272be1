//! Deadlines for calls into the Credential Store and Cache Layer.

use std::time::Duration;

use crate::error::{WardenError, WardenResult};

/// Runs `fut` under `deadline`. Running out of time is a
/// [`WardenError::Transient`] failure, never an answer.
pub async fn with_deadline<T>(
    deadline: Duration,
    what: &'static str,
    fut: impl Future<Output = WardenResult<T>>,
) -> WardenResult<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(WardenError::Transient(format!(
            "{what} exceeded its {}ms deadline",
            deadline.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_becomes_transient() {
        let result: WardenResult<()> = with_deadline(Duration::from_millis(50), "cache", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_retryable(), "expected transient, got {err:?}");
    }

    #[tokio::test]
    async fn inner_result_passes_through() {
        let ok = with_deadline(Duration::from_secs(1), "db", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: WardenResult<()> = with_deadline(Duration::from_secs(1), "db", async {
            Err(WardenError::InvalidToken)
        })
        .await;
        assert!(matches!(err, Err(WardenError::InvalidToken)));
    }
}
