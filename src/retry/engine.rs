use super::policy::RetryPolicy;
use crate::error::RetryError;
use backon::BackoffBuilder;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of one attempt of an operation driven by [`RetryEngine`].
#[derive(Debug)]
pub enum Attempt<T, E> {
    Success(T),
    /// Transient failure; consumes one attempt. `retry_after` replaces the next
    /// computed wait once.
    Retryable { retry_after: Option<Duration> },
    /// Aborts the run immediately.
    Fatal(E),
}

impl<T, E> Attempt<T, E> {
    pub fn retry() -> Self {
        Self::Retryable { retry_after: None }
    }

    pub fn retry_after(delay: Duration) -> Self {
        Self::Retryable {
            retry_after: Some(delay),
        }
    }
}

/// `Ok(true)` succeeds, `Ok(false)` retries, `Err` is fatal.
impl<E> From<Result<bool, E>> for Attempt<(), E> {
    fn from(result: Result<bool, E>) -> Self {
        match result {
            Ok(true) => Self::Success(()),
            Ok(false) => Self::retry(),
            Err(e) => Self::Fatal(e),
        }
    }
}

/// Drives an operation through at most `max_attempts` invocations.
#[derive(Debug, Clone)]
pub struct RetryEngine {
    policy: RetryPolicy,
    next_retry: Option<Duration>,
}

impl RetryEngine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            next_retry: None,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Overrides the next computed wait; the policy resumes afterwards.
    ///
    /// A server hint still wins, and the override stays pending until a wait
    /// without a hint uses it.
    pub fn set_next_retry(&mut self, delay: Duration) {
        self.next_retry = Some(delay);
    }

    /// Runs `op` until it succeeds, fails fatally, exhausts the attempt budget,
    /// or `cancel` fires while waiting between attempts.
    pub async fn run<T, E, F, Fut>(
        &mut self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
        E: std::error::Error + 'static,
    {
        let max_attempts = self.policy.max_attempts();
        let mut backoff = self.policy.clone().build();
        let mut attempts: u32 = 0;

        loop {
            let retry_after = match op().await {
                Attempt::Success(value) => return Ok(value),
                Attempt::Fatal(source) => {
                    return Err(RetryError::Fatal {
                        name: self.policy.name().to_string(),
                        source,
                    });
                }
                Attempt::Retryable { retry_after } => retry_after,
            };

            attempts += 1;
            warn!(
                name = %self.policy.name(),
                attempt = attempts,
                max_attempts,
                "running {:?} failed ({}/{})",
                self.policy.name(),
                attempts,
                max_attempts
            );

            // The backoff holds exactly max_attempts - 1 waits.
            let Some(computed) = backoff.next() else {
                return Err(RetryError::Exhausted {
                    name: self.policy.name().to_string(),
                    max_attempts,
                });
            };
            let delay = match retry_after {
                Some(hint) => hint,
                None => self.next_retry.take().unwrap_or(computed),
            };
            debug!(name = %self.policy.name(), ?delay, "waiting before next attempt");

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(RetryError::Cancelled {
                        name: self.policy.name().to_string(),
                    });
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
