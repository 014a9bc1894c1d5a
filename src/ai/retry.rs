//! Bounded retry with exponential backoff, kept separate from the
//! transport so it can be driven by a fake clock.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Something that can wait. Production code waits on the tokio timer,
/// tests record the requested delays instead.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub type BoxedSleeper = Box<dyn Sleeper + 'static>;

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try. Zero is treated as one so
    /// the operation always runs at least once.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    /// before trying again.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Runs `operation` until it succeeds or the attempts run out,
    /// returning the last error in that case. There is no sleep after
    /// the final attempt.
    pub async fn run<F, Fut, T, E>(&self, sleeper: &dyn Sleeper, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            tracing::debug!("Completion attempt {} of {}", attempt, self.max_attempts);
            match operation(attempt).await {
                Ok(result) => return Ok(result),
                Err(err) if attempt >= self.max_attempts => {
                    tracing::error!("Giving up after {} attempts: {}", attempt, err);
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_before(attempt);
                    tracing::warn!(
                        "Attempt {} failed, retrying in {:?}: {}",
                        attempt,
                        delay,
                        err
                    );
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
