//! Sliding-window admission control keyed by (route, caller).
//!
//! The limiter holds an explicit handle to a shared `WindowStore`; there is no
//! process-wide instance. Store failures fail open.

pub mod middleware;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, warn};

use crate::rate_limit::store::WindowStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u64,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted { remaining: u64 },
    Rejected { remaining: u64, retry_after: Duration },
    /// The store could not be consulted; the request is let through.
    FailOpen,
}

#[cfg(test)]
impl Decision {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Decision::Rejected { .. })
    }
}

/// `rate_limit:{route}:{caller}`
pub fn rate_limit_key(route: &str, caller: &str) -> String {
    format!("rate_limit:{route}:{caller}")
}

pub struct SlidingWindowLimiter {
    store: Arc<dyn WindowStore>,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn WindowStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, key: &str, policy: RateLimitPolicy) -> Decision {
        self.check_at(key, policy, Utc::now().timestamp_millis()).await
    }

    /// Records a request at `now_ms` and decides on it. The request counts toward its
    /// own window, so the (limit + 1)-th request inside `window` is rejected. Rejected
    /// requests are recorded too.
    pub async fn check_at(&self, key: &str, policy: RateLimitPolicy, now_ms: i64) -> Decision {
        let snapshot = match self.store.record(key, now_ms, policy.window).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(key, "Rate limit store unavailable, admitting request: {e}");
                return Decision::FailOpen;
            }
        };

        let remaining = policy.limit.saturating_sub(snapshot.count);
        if snapshot.count <= policy.limit {
            return Decision::Admitted { remaining };
        }

        let window_ms = policy.window.as_millis() as i64;
        let retry_after_ms = snapshot
            .oldest_ms
            .map(|oldest| (oldest + window_ms - now_ms).max(0))
            .unwrap_or(window_ms);
        warn!(key, count = snapshot.count, limit = policy.limit, "Rate limit exceeded");
        Decision::Rejected {
            remaining,
            retry_after: Duration::from_millis(retry_after_ms as u64),
        }
    }

    /// Remaining quota for `key` without recording anything. `None` when the store is down.
    pub async fn remaining(&self, key: &str, policy: RateLimitPolicy) -> Option<u64> {
        self.remaining_at(key, policy, Utc::now().timestamp_millis())
            .await
    }

    pub async fn remaining_at(&self, key: &str, policy: RateLimitPolicy, now_ms: i64) -> Option<u64> {
        match self.store.count(key, now_ms, policy.window).await {
            Ok(count) => Some(policy.limit.saturating_sub(count)),
            Err(e) => {
                error!(key, "Rate limit store unavailable: {e}");
                None
            }
        }
    }
}
