//! Fixed-delay retry shared by the transport and semantic layers.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::ticketing::TicketingError;

/// How many times to try, how long to wait between tries, and which
/// errors are worth another try.
pub struct RetryPolicy<E> {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub delay: Duration,
    pub qualifies: fn(&E) -> bool,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

/// Final result plus the number of attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn retried(&self) -> bool {
        self.attempts > 1
    }
}

impl<E: std::fmt::Display> RetryPolicy<E> {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run `op` until it succeeds, fails with a non-qualifying error, or
    /// the attempt budget is spent. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(v) => {
                    if attempt > 1 {
                        info!(op = label, attempt, "retry successful");
                    }
                    return RetryOutcome {
                        result: Ok(v),
                        attempts: attempt,
                    };
                },
                Err(e) if attempt < max && (self.qualifies)(&e) => {
                    warn!(
                        op = label,
                        attempt,
                        max_attempts = max,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %e,
                        "retrying after failure"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                },
                Err(e) => {
                    return RetryOutcome {
                        result: Err(e),
                        attempts: attempt,
                    }
                },
            }
        }
    }
}

impl RetryPolicy<TicketingError> {
    /// Inside every ticketing call: 5xx retried up to three more times.
    pub fn transport() -> Self {
        Self {
            max_attempts: 4,
            delay: Duration::from_secs(5),
            qualifies: TicketingError::is_server_error,
        }
    }

    /// Around the final mutation only: one more try after a 5xx.
    pub fn semantic() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(15),
            qualifies: TicketingError::is_server_error,
        }
    }
}
