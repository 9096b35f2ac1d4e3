//! Bounded exponential backoff for reconnection attempts.

use std::time::Duration;

/// Doubling delay with a cap and a bounded attempt count.
///
/// The streaming client resets the backoff after every successful
/// session establishment, so the attempt budget applies to consecutive
/// failures only.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff starting at `initial`, doubling up to `max_delay`,
    /// allowing `max_attempts` consecutive failures.
    pub fn new(initial: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max_delay,
            max_attempts,
            attempt: 0,
        }
    }

    /// The delay before the next attempt, or `None` once the attempt
    /// budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = self
            .initial
            .saturating_mul(1_u32 << self.attempt.min(16))
            .min(self.max_delay);
        self.attempt += 1;
        Some(delay)
    }

    /// Forget accumulated failures.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Consecutive failures counted so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    /// 1 s initial delay, doubling to a 30 s cap, 8 attempts.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 8)
    }
}
