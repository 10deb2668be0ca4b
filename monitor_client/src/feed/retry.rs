//! Fixed-interval reconnection budget

use std::time::Duration;

/// Reconnection limits for a live feed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive closes that may still be followed by a reconnect
    pub max_attempts: u32,

    /// Delay before each reconnect
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(3000))
    }
}

/// Consecutive-close counter
///
/// Only a successful open clears the counter. Failing to establish a
/// connection counts as a close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes seen since the last successful open
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Connection opened; the next disconnect gets the full budget again
    pub fn record_open(&mut self) {
        self.attempt = 0;
    }

    /// Connection closed. Returns the delay before the next attempt, or
    /// `None` once the budget is spent.
    pub fn record_close(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        if self.attempt <= policy.max_attempts {
            Some(policy.interval)
        } else {
            None
        }
    }

    /// True once no further reconnect will be scheduled
    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempt > policy.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
