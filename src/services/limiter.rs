// src/services/limiter.rs

//! Global token-bucket rate limiter shared by all fetch workers.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Rates at and above this are treated as "effectively unlimited" and skip
/// the bucket entirely.
const UNLIMITED_THRESHOLD: f64 = 1000.0;

/// Token bucket with capacity equal to its refill rate, i.e. one second of
/// burst. One token is taken per request across all workers.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate: f64) -> Self {
        // A non-positive rate would never refill.
        let rate = rate.max(0.001);
        Self {
            rate,
            state: Mutex::new(BucketState {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Block until a token is available, then take it.
    ///
    /// There is no fairness guarantee across waiters; all of them sleep the
    /// same refill interval, which prevents starvation statistically.
    pub async fn acquire(&self) {
        if self.rate >= UNLIMITED_THRESHOLD {
            return;
        }
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate).min(self.rate);
                state.last_refill = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate)
            };
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_is_immediate() {
        let bucket = TokenBucket::new(4.0);
        let start = Instant::now();
        for _ in 0..4 {
            bucket.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_beyond_capacity_waits_for_refill() {
        let bucket = TokenBucket::new(4.0);
        let start = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        // Fifth token needs one refill interval at 4 tokens/sec.
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_rate_bound() {
        // 40 acquisitions at 4/sec with a 4-token burst: at least 9 seconds.
        let bucket = TokenBucket::new(4.0);
        let start = Instant::now();
        for _ in 0..40 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_path_is_unmetered() {
        let bucket = TokenBucket::new(1000.0);
        let start = Instant::now();
        for _ in 0..10_000 {
            bucket.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_clamps_to_capacity() {
        let bucket = TokenBucket::new(2.0);
        for _ in 0..2 {
            bucket.acquire().await;
        }
        // Long idle must not accumulate more than one second of burst.
        sleep(Duration::from_secs(60)).await;
        let start = Instant::now();
        for _ in 0..3 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
