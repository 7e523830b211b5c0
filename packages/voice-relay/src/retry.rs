//! Reconnect scheduling.

use std::time::Duration;

/// Decides how long to wait before reconnect attempt `attempt` (1-based).
///
/// Returning `None` stops reconnecting.
pub trait RetryPolicy: Send + Sync {
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay forever. The default is five seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl FixedDelay {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000))
    }
}

impl RetryPolicy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt > max => None,
            _ => Some(self.delay),
        }
    }
}

/// Doubling delay, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt > max {
                return None;
            }
        }
        let shift = attempt.saturating_sub(1).min(31);
        let delay = self.initial.saturating_mul(1u32 << shift);
        Some(delay.min(self.max))
    }
}
