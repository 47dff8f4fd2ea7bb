//! Status-code driven retries.
//!
//! The policy is a fixed wait between attempts and a set of retryable
//! status codes. With `max_retries = N` the server observes at most `N + 1`
//! requests. Bodies that cannot be replayed stop the loop after the first
//! attempt.

use std::collections::HashSet;
use std::time::Duration;

use http::StatusCode;

/// A retry policy.
#[derive(Clone, Debug)]
pub struct Policy {
    max_retries: u32,
    wait: Duration,
    statuses: HashSet<StatusCode>,
}

impl Policy {
    /// A policy that never retries.
    pub fn never() -> Policy {
        Policy {
            max_retries: 0,
            wait: Duration::ZERO,
            statuses: HashSet::new(),
        }
    }

    /// Retry up to `max_retries` extra attempts, waiting `wait` between
    /// attempts, on the default status set (429, 500, 503).
    pub fn new(max_retries: u32, wait: Duration) -> Policy {
        Policy {
            max_retries,
            wait,
            statuses: [
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::SERVICE_UNAVAILABLE,
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Replaces the retryable status set.
    pub fn statuses<I>(mut self, statuses: I) -> Policy
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// The wait between attempts.
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Extra attempts allowed beyond the first.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub(crate) fn should_retry(&self, status: StatusCode, prior_retries: u32) -> bool {
        prior_retries < self.max_retries && self.statuses.contains(&status)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_bound_is_max_plus_one() {
        let policy = Policy::new(3, Duration::from_millis(50));
        let status = StatusCode::SERVICE_UNAVAILABLE;
        let mut attempts = 1;
        while policy.should_retry(status, attempts - 1) {
            attempts += 1;
        }
        assert_eq!(attempts, 4);
    }

    #[test]
    fn default_status_set() {
        let policy = Policy::new(1, Duration::ZERO);
        assert!(policy.should_retry(StatusCode::INTERNAL_SERVER_ERROR, 0));
        assert!(policy.should_retry(StatusCode::TOO_MANY_REQUESTS, 0));
        assert!(policy.should_retry(StatusCode::SERVICE_UNAVAILABLE, 0));
        assert!(!policy.should_retry(StatusCode::BAD_GATEWAY, 0));
    }

    #[test]
    fn custom_status_set() {
        let policy =
            Policy::new(1, Duration::ZERO).statuses([StatusCode::BAD_GATEWAY]);
        assert!(policy.should_retry(StatusCode::BAD_GATEWAY, 0));
        assert!(!policy.should_retry(StatusCode::SERVICE_UNAVAILABLE, 0));
    }

    #[test]
    fn never_retries() {
        assert!(!Policy::never().should_retry(StatusCode::SERVICE_UNAVAILABLE, 0));
    }
}
