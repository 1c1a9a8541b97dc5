// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-account token-bucket rate limiting.
//!
//! Accounts are limited by a daily request quota with a burst allowance.
//! `get_zones` and `get_zone_state` cost one token each; `execute` costs one
//! token per non-delete change request (deletions are exempt so cleanup is
//! never starved). Callers block cooperatively until tokens are available;
//! deadlines come from the caller's context.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Rate-limit quota as declared on a provider or in process configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitQuota {
    /// Sustained request budget per day
    pub requests_per_day: u32,

    /// Extra requests allowed in a burst
    pub burst: u32,
}

impl RateLimitQuota {
    /// The sustained rate in requests per second.
    #[must_use]
    pub fn per_second(&self) -> f64 {
        f64::from(self.requests_per_day) / 86_400.0
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket enforcing a [`RateLimitQuota`].
pub struct TokenBucket {
    rate_per_sec: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// A bucket starting full.
    #[must_use]
    pub fn new(quota: RateLimitQuota) -> Self {
        let capacity = f64::from(quota.burst.max(1));
        Self {
            rate_per_sec: quota.per_second().max(f64::MIN_POSITIVE),
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        state.last_refill = now;
    }

    /// Take `n` tokens without blocking. Returns `false` if unavailable.
    #[must_use]
    pub fn try_acquire(&self, n: u32) -> bool {
        let needed = f64::from(n);
        let mut state = self.state.lock().expect("token bucket lock poisoned");
        self.refill(&mut state);
        if state.tokens >= needed {
            state.tokens -= needed;
            true
        } else {
            false
        }
    }

    /// Take `n` tokens, sleeping until they accrue.
    ///
    /// Tokens are taken one at a time so a cost larger than the burst
    /// capacity still completes, paced at the sustained rate. The lock is
    /// never held across a sleep; concurrent acquirers make independent
    /// progress and wake-ups re-check availability.
    pub async fn acquire(&self, n: u32) {
        for _ in 0..n {
            self.acquire_one().await;
        }
    }

    async fn acquire_one(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("token bucket lock poisoned");
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                let missing = 1.0 - state.tokens;
                Duration::from_secs_f64(missing / self.rate_per_sec)
            };
            sleep(wait.min(Duration::from_secs(60))).await;
        }
    }
}

#[cfg(test)]
#[path = "ratelimit_tests.rs"]
mod ratelimit_tests;
