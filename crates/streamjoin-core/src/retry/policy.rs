use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, short body, etc.).
    Connection,
    /// Server error status (5xx).
    Http5xx(u16),
    /// Server answered a ranged GET without 206.
    RangeRejected,
    /// Any other error (not retried).
    Other,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Other)
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Linear backoff with a growing per-attempt timeout.
///
/// Attempt `n` (1-based) runs with a timeout of `attempt_timeout * n`; after it
/// fails the next attempt waits `backoff_step * n`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Timeout of the first attempt.
    pub attempt_timeout: Duration,
    /// Backoff unit; multiplied by the attempt number.
    pub backoff_step: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout: Duration::from_secs(30),
            backoff_step: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Timeout for the given 1-based attempt.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.attempt_timeout.saturating_mul(attempt.max(1))
    }

    /// Backoff delay after the given 1-based attempt failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step
            .saturating_mul(attempt.max(1))
            .min(self.max_delay)
    }

    /// Decide what to do after `attempt` (1-based) failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay_after(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn backoff_is_linear_in_attempt() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.decide(1, ErrorKind::Timeout),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            p.decide(2, ErrorKind::RangeRejected),
            RetryDecision::RetryAfter(Duration::from_secs(4))
        );
        assert_eq!(
            p.decide(4, ErrorKind::Connection),
            RetryDecision::RetryAfter(Duration::from_secs(8))
        );
    }

    #[test]
    fn backoff_is_capped() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 100;
        assert_eq!(p.delay_after(50), p.max_delay);
    }

    #[test]
    fn timeout_grows_with_attempt() {
        let p = RetryPolicy::default();
        assert_eq!(p.timeout_for(1), Duration::from_secs(30));
        assert_eq!(p.timeout_for(3), Duration::from_secs(90));
    }

    #[test]
    fn respects_max_attempts() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 3;
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }
}
