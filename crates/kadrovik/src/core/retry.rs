//! Exponential backoff with jitter for transient failures.
//!
//! The outbox writer wraps spreadsheet appends in [`retry`]; everything it
//! needs to know about an error is whether trying again can help, which the
//! [`Retryable`] trait answers per error type.

use std::future::Future;
use std::time::Duration;

use crate::core::error::AppError;

/// Backoff parameters for one retried operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling for the computed delay
    pub max_delay: Duration,
    /// Growth factor between attempts
    pub backoff_multiplier: f64,
    /// Adds up to 25% random slack to each delay
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Short in-process retries. The outbox has its own attempt counter on
    /// top of this, so two quick tries per drain pass are enough.
    pub fn quick() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let slack = if self.add_jitter {
            rand::random::<f64>() * 0.25 * capped
        } else {
            0.0
        };
        Duration::from_secs_f64(capped + slack)
    }
}

/// What [`retry`] hands back: the final result plus how many attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Whether an error is worth retrying at all.
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Server-suggested wait, e.g. from a rate limit response.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for teloxide::RequestError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            teloxide::RequestError::Network(_) | teloxide::RequestError::RetryAfter(_)
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            teloxide::RequestError::RetryAfter(seconds) => Some(seconds.duration()),
            _ => None,
        }
    }
}

impl Retryable for std::io::Error {
    fn is_retryable(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::TimedOut
                | ErrorKind::Interrupted
        )
    }
}

impl Retryable for reqwest::Error {
    fn is_retryable(&self) -> bool {
        self.is_timeout() || self.is_connect() || self.is_request()
    }
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        match self {
            AppError::Http(e) => e.is_retryable(),
            AppError::HttpStatus(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            AppError::Telegram(e) => e.is_retryable(),
            AppError::Io(e) => e.is_retryable(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::Telegram(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Runs `operation`, retrying retryable errors up to `config.max_retries`
/// times with growing delays. A non-retryable error ends the loop at once.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Debug,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(e) if attempts <= config.max_retries && e.is_retryable() => {
                let delay = e
                    .retry_after()
                    .unwrap_or_else(|| config.delay_for_attempt(attempts - 1));
                log::warn!(
                    "Attempt {}/{} failed, next try in {:?}: {:?}",
                    attempts,
                    config.max_retries + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return RetryOutcome {
                    result: Err(e),
                    attempts,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.transient
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let outcome = retry(&fast(), || async { Ok::<_, TestError>(42) }).await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_error_recovers() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let outcome = retry(&fast(), || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError { transient: true })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_transient_error_gives_up_after_cap() {
        let outcome = retry(&fast(), || async { Err::<i32, _>(TestError { transient: true }) }).await;

        assert!(!outcome.is_ok());
        // 1 initial attempt + max_retries
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_without_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let outcome = retry(&fast(), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError { transient: false })
            }
        })
        .await;

        assert!(!outcome.is_ok());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_adds_at_most_a_quarter() {
        let config = RetryConfig {
            add_jitter: true,
            ..RetryConfig::default()
        };

        for attempt in 0..4 {
            let base = config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(attempt);
            let capped = base.min(config.max_delay.as_secs_f64());
            let delay = config.delay_for_attempt(attempt as u32).as_secs_f64();
            assert!(delay >= capped);
            assert!(delay <= capped * 1.25 + f64::EPSILON);
        }
    }
}
