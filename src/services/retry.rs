//! Retry with exponential backoff for transient ingestor failures:
//! 3 attempts, delays doubling from 1s and capped at 8s.

use std::future::Future;
use std::time::Duration;

pub const MAX_ATTEMPTS: u32 = 3;
pub const BASE_DELAY_SECS: u64 = 1;
pub const MAX_DELAY_SECS: u64 = 8;

pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = (BASE_DELAY_SECS << attempt).min(MAX_DELAY_SECS);
    Duration::from_secs(secs)
}

pub async fn retry_with_backoff<T, E, F, Fut>(label: &str, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    target = label,
                    error = %err,
                    attempt = attempt + 1,
                    delay_secs = delay.as_secs(),
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(10), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
