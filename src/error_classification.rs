//! Classification of announcement fetch outcomes and the retry backoff they drive.
//!
//! Connectivity problems (network errors, 401/403/407, 5xx) are retried with
//! exponential backoff. Other 4xx responses mean "nothing to show" and never
//! engage backoff. Content problems are handled by the parser, not here.

use std::time::Duration;

/// First retry delay after a connectivity fault.
pub const RETRY_INITIAL: Duration = Duration::from_millis(10_000);

/// Retry delays never exceed this.
pub const RETRY_MAX: Duration = Duration::from_millis(600_000);

/// How a poll cycle should treat an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx: body holds an announcements payload
    Success,
    /// Transient: auth/proxy challenges and server errors
    Retryable,
    /// Terminal for this cycle: nothing to show
    Rejected,
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 | 403 | 407 => StatusClass::Retryable,
        500..=599 => StatusClass::Retryable,
        _ => StatusClass::Rejected,
    }
}

/// Exponential retry delay: doubles after every use, capped at a ceiling.
///
/// Reaching the ceiling is reported through [`RetryDelay::is_exhausted`]; the
/// poller then gives up on backoff and falls back to its base interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDelay {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl RetryDelay {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay the next retry will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// True once the delay has grown to the ceiling.
    pub fn is_exhausted(&self) -> bool {
        self.current >= self.max
    }

    /// Return the current delay and double it for next time (capped).
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Back to the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::new(RETRY_INITIAL, RETRY_MAX)
    }
}
