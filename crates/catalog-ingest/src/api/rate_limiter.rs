//! Minimum-interval rate limiter.
//!
//! Every outbound call goes through [`RateLimiter::throttle`]. The last-call
//! instant sits behind an async mutex that is held across both the wait and
//! the call itself, so clones of the limiter shared between tasks still never
//! issue two calls closer together than the configured interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Rate limiter enforcing a minimum interval between calls
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum time between the end of one call and the start of the next
    min_interval: Duration,
    /// Completion time of the previous call attempt
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait for the interval to elapse, run `call`, then record the attempt
    ///
    /// The attempt is recorded whatever the call returns, so a burst of
    /// failures is paced exactly like a burst of successes.
    pub async fn throttle<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_call = self.last_call.lock().await;

        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!(
                    wait_ms = wait_time.as_millis() as u64,
                    "Rate limit: waiting for minimum interval"
                );
                sleep(wait_time).await;
            }
        }

        let output = call().await;
        *last_call = Some(Instant::now());
        output
    }

    /// Block every caller for `duration`
    ///
    /// Used after the upstream signals that its rate limit was exceeded.
    pub async fn cooldown(&self, duration: Duration) {
        let mut last_call = self.last_call.lock().await;
        tracing::warn!(
            cooldown_secs = duration.as_secs(),
            "Rate limit exceeded upstream, cooling down"
        );
        sleep(duration).await;
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_calls_respect_min_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.throttle(|| async {}).await;
        }

        assert!(start.elapsed() >= Duration::from_millis(800 * 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        let start = Instant::now();

        limiter.throttle(|| async {}).await;

        assert!(start.elapsed() < Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_attempts_are_paced() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        let start = Instant::now();

        for _ in 0..3 {
            let result: Result<(), &str> = limiter.throttle(|| async { Err("boom") }).await;
            assert!(result.is_err());
        }

        assert!(start.elapsed() >= Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_counts_from_end_of_slow_call() {
        let limiter = RateLimiter::new(Duration::from_millis(800));

        limiter
            .throttle(|| async { sleep(Duration::from_millis(500)).await })
            .await;
        let after_first = Instant::now();
        limiter.throttle(|| async {}).await;

        assert!(after_first.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_the_gate() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = limiter.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .throttle(move || async move {
                        calls.lock().await.push(Instant::now());
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut calls = calls.lock().await.clone();
        calls.sort();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(800));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_delays_next_call() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.cooldown(Duration::from_secs(60)).await;
        limiter.throttle(|| async {}).await;

        assert!(start.elapsed() >= Duration::from_secs(60) + Duration::from_millis(100));
    }
}
