// Retry policy for metric source calls: exponential backoff with jitter and a
// timeout per attempt. Only transient errors are retried.

use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use super::SourceError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
            jitter: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceRetryHandler {
    config: RetryConfig,
}

impl Default for SourceRetryHandler {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl SourceRetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of
    /// attempts.
    pub async fn execute<F, Fut, T>(&self, name: &str, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let timeout = self.config.timeout;
        let result = RetryIf::spawn(
            self.strategy(),
            || {
                let call = operation();
                async move {
                    match tokio::time::timeout(timeout, call).await {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::Timeout(timeout)),
                    }
                }
            },
            |error: &SourceError| {
                let transient = error.is_transient();
                if transient {
                    warn!(operation = name, error = %error, "Metric source call failed");
                }
                transient
            },
        )
        .await;

        if result.is_ok() {
            debug!(operation = name, "Metric source call succeeded");
        }
        result
    }

    /// Delays between attempts, doubling from `base_delay` up to `max_delay`.
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let base_ms = (self.config.base_delay.as_millis() as u64 / 2).max(1);
        let with_jitter = self.config.jitter;
        ExponentialBackoff::from_millis(2)
            .factor(base_ms)
            .max_delay(self.config.max_delay)
            .map(move |delay| if with_jitter { jitter(delay) } else { delay })
            .take(self.config.max_attempts.max(1) as usize - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn refused() -> SourceError {
        SourceError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "test error",
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failure() {
        let handler = SourceRetryHandler::default();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = handler
            .execute("flaky", || {
                let attempts = Arc::clone(&attempts);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(refused())
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(assert_ok!(result), "success");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_immediately() {
        let handler = SourceRetryHandler::default();
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = handler
            .execute("broken", || {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(SourceError::UnknownFact("nope".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(SourceError::UnknownFact(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let handler = SourceRetryHandler::new(RetryConfig {
            max_attempts: 2,
            jitter: false,
            ..RetryConfig::default()
        });
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = handler
            .execute("down", || {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(refused())
                }
            })
            .await;

        assert!(matches!(result, Err(SourceError::Io(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let handler = SourceRetryHandler::new(RetryConfig {
            max_attempts: 1,
            timeout: Duration::from_secs(1),
            ..RetryConfig::default()
        });

        let result: Result<(), _> = handler
            .execute("slow", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(SourceError::Timeout(_))));
    }

    #[test]
    fn delay_grows_and_is_capped() {
        let handler = SourceRetryHandler::new(RetryConfig {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            jitter: false,
            ..RetryConfig::default()
        });
        let delays: Vec<Duration> = handler.strategy().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300)
            ]
        );
    }

    #[test]
    fn single_attempt_never_waits() {
        let handler = SourceRetryHandler::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        });
        assert_eq!(handler.strategy().count(), 0);
    }
}
