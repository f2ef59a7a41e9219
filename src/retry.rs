use log::debug;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

/// Retry policy for a single remote call. No jitter, no growth, no rate limiting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` retries transient errors forever.
    pub max_attempts: Option<u32>,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl RetryPolicy {
    pub fn constant(delay: Duration) -> Self {
        RetryPolicy {
            delay,
            max_attempts: None,
        }
    }

    fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_transient: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && self.allows(attempt) => {
                    debug!(
                        "Transient error on attempt {}, retrying in {:?}: {}",
                        attempt, self.delay, err
                    );
                    attempt += 1;
                    sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
