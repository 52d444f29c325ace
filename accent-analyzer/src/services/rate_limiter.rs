//! Per-caller request rate limiting
//!
//! One GCRA bucket per caller IP: `max_count` requests may arrive back to
//! back, after which capacity refills at `window / max_count`.

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// Default allowance per caller per minute
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 10;

/// Caller exceeded its allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Rate limit exceeded, retry in {}s", retry_after.as_secs().max(1))]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

/// Requests allowed per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_count: NonZeroU32,
}

impl RateLimitPolicy {
    pub fn per_minute(max_count: NonZeroU32) -> Self {
        Self {
            window: Duration::from_secs(60),
            max_count,
        }
    }

    fn quota(&self) -> Quota {
        let period = self.window / self.max_count.get();
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_minute(self.max_count))
            .allow_burst(self.max_count)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::per_minute(NonZeroU32::new(DEFAULT_REQUESTS_PER_MINUTE).unwrap_or(NonZeroU32::MIN))
    }
}

/// Keyed limiter over caller addresses
pub struct CallerRateLimiter {
    policy: RateLimitPolicy,
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
}

impl CallerRateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            limiter: RateLimiter::keyed(policy.quota()),
            clock: DefaultClock::default(),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Count one request from `caller`
    pub fn check(&self, caller: IpAddr) -> Result<(), RateLimitExceeded> {
        self.limiter.check_key(&caller).map_err(|not_until| {
            let retry_after = not_until.wait_time_from(self.clock.now());
            tracing::warn!(
                caller = %caller,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            RateLimitExceeded { retry_after }
        })
    }

    /// Forget callers whose buckets have fully refilled
    pub fn purge_idle(&self) {
        self.limiter.retain_recent();
    }

    /// Number of callers currently tracked
    pub fn tracked_callers(&self) -> usize {
        self.limiter.len()
    }
}
