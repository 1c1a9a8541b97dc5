// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ratelimit.rs`

#[cfg(test)]
mod tests {
    use crate::ratelimit::{RateLimitQuota, TokenBucket};
    use tokio::time::Instant;

    #[test]
    fn quota_per_second() {
        let quota = RateLimitQuota {
            requests_per_day: 86_400,
            burst: 1,
        };
        assert!((quota.per_second() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn burst_is_available_immediately() {
        let bucket = TokenBucket::new(RateLimitQuota {
            requests_per_day: 86_400,
            burst: 5,
        });
        for _ in 0..5 {
            assert!(bucket.try_acquire(1));
        }
        assert!(!bucket.try_acquire(1));
    }

    #[test]
    fn zero_cost_never_blocks() {
        let bucket = TokenBucket::new(RateLimitQuota {
            requests_per_day: 1,
            burst: 1,
        });
        assert!(bucket.try_acquire(0));
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_refill() {
        let bucket = TokenBucket::new(RateLimitQuota {
            requests_per_day: 86_400, // 1/s
            burst: 1,
        });
        bucket.acquire(1).await;

        let start = Instant::now();
        bucket.acquire(1).await;
        // With a 1/s rate the second token needs about a second of refill.
        assert!(start.elapsed().as_millis() >= 900);
    }

    #[tokio::test(start_paused = true)]
    async fn three_sequential_requests_at_one_per_second_take_two_seconds() {
        let bucket = TokenBucket::new(RateLimitQuota {
            requests_per_day: 86_400,
            burst: 1,
        });
        let start = Instant::now();
        bucket.acquire(1).await;
        bucket.acquire(1).await;
        bucket.acquire(1).await;
        assert!(start.elapsed().as_secs_f64() >= 2.0 - 1e-3);
    }
}
