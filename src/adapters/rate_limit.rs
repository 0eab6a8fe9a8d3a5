//! Minimum-spacing rate limiter for the stats endpoints.
//!
//! The stats host throttles bursts aggressively, so calls are spaced out
//! one at a time: a GCRA quota with a period of `min_interval` and a burst
//! of one.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::time::Duration;
use tracing::debug;

type DirectLimiter = GovLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Enforces a minimum interval between permitted calls.
///
/// Concurrent callers each wait for their own slot, so one instance can
/// guard one endpoint class across tasks.
#[derive(Debug)]
pub struct RateLimiter {
    // None when the interval is zero
    limiter: Option<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(min_interval).map(GovLimiter::direct),
        }
    }

    /// Limiter that never delays
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    /// Wait until a call slot is available, then claim it.
    pub async fn wait(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        if limiter.check().is_err() {
            debug!("Rate limit: waiting for next slot");
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    // governor runs on its own monotonic clock, so these use real (short) time

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_back_to_back_calls_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn test_no_delay_after_interval_passed() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        limiter.wait().await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        let before = Instant::now();
        limiter.wait().await;
        assert!(before.elapsed() < Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_concurrent_callers_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.wait().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(290));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
