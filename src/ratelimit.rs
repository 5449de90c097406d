//! Quote submission throttling
//!
//! Per-client limiter for public contact/quote submissions. Each client may
//! submit `limit` requests per window; allowance drips back over the window
//! so a client that waits out the window has its full allowance again.
//!
//! Backed by `governor`'s keyed limiter, which is safe to share across
//! threads.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use thiserror::Error;
use tracing::{debug, warn};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[derive(Debug, Error, PartialEq)]
pub enum RateLimitError {
    #[error("Too many submissions, retry after {} seconds", .retry_after.as_secs().max(1))]
    Exceeded { retry_after: Duration },
}

pub struct SubmissionLimiter {
    limiter: Option<KeyedLimiter>,
    clock: DefaultClock,
    limit: u32,
    window: Duration,
}

impl SubmissionLimiter {
    /// Allow `limit` submissions per client per `window`. A limit of zero
    /// disables throttling.
    pub fn new(limit: u32, window: Duration) -> Self {
        let limiter = NonZeroU32::new(limit).and_then(|burst| {
            let period = window / burst.get();
            Quota::with_period(period).map(|quota| RateLimiter::keyed(quota.allow_burst(burst)))
        });

        if limiter.is_none() {
            warn!(limit, ?window, "Submission throttling disabled");
        }

        Self {
            limiter,
            clock: DefaultClock::default(),
            limit,
            window,
        }
    }

    /// Record one submission for `client`, failing once its allowance is spent
    pub fn check(&self, client: &str) -> Result<(), RateLimitError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        let key = normalize_client(client);
        let result = limiter.check_key(&key).map_err(|not_until| {
            let retry_after = not_until.wait_time_from(self.clock.now());
            warn!(client = %key, ?retry_after, "Submission rate limit exceeded");
            RateLimitError::Exceeded { retry_after }
        });

        limiter.retain_recent();
        debug!(tracked_clients = limiter.len(), "Submission limiter checked");

        result
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Client identities compare case-insensitively
fn normalize_client(client: &str) -> String {
    client.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_client() {
        let limiter = SubmissionLimiter::new(3, Duration::from_secs(3600));
        for _ in 0..3 {
            assert!(limiter.check("buyer@example.com").is_ok());
        }
        assert!(matches!(
            limiter.check("buyer@example.com"),
            Err(RateLimitError::Exceeded { .. })
        ));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = SubmissionLimiter::new(1, Duration::from_secs(3600));
        assert!(limiter.check("a@example.com").is_ok());
        assert!(limiter.check("b@example.com").is_ok());
        assert!(limiter.check("a@example.com").is_err());
    }

    #[test]
    fn test_client_key_is_normalized() {
        let limiter = SubmissionLimiter::new(1, Duration::from_secs(3600));
        assert!(limiter.check("Buyer@Example.com").is_ok());
        assert!(limiter.check("  buyer@example.com ").is_err());
    }

    #[test]
    fn test_allowance_returns_after_window() {
        let limiter = SubmissionLimiter::new(1, Duration::from_millis(50));
        assert!(limiter.check("buyer@example.com").is_ok());
        assert!(limiter.check("buyer@example.com").is_err());
        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.check("buyer@example.com").is_ok());
    }

    #[test]
    fn test_zero_limit_disables() {
        let limiter = SubmissionLimiter::new(0, Duration::from_secs(60));
        assert!(!limiter.is_enabled());
        for _ in 0..100 {
            assert!(limiter.check("buyer@example.com").is_ok());
        }
    }
}
