//! Token-bucket rate limiting for reconciliation frequency.
//!
//! Every reconciliation blocks on [`RateLimiter::accept`] before
//! proceeding, bounding reload frequency regardless of how bursty the
//! upstream event stream is.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// A token bucket with burst = 1: at most one reconciliation may proceed
/// immediately, every subsequent one waits for the bucket to refill.
pub struct RateLimiter {
    state: Mutex<BucketState>,
    refill_rate_per_sec: f64,
}

struct BucketState {
    available_tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// `refill_rate_per_sec` corresponds to `SyncRateLimit`.
    pub fn new(refill_rate_per_sec: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                available_tokens: 1.0,
                last_refill: Instant::now(),
            }),
            refill_rate_per_sec,
        }
    }

    /// Blocks until a token is available, then consumes it.
    pub async fn accept(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.available_tokens = (state.available_tokens + elapsed * self.refill_rate_per_sec).min(1.0);
                state.last_refill = now;

                if state.available_tokens >= 1.0 {
                    state.available_tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - state.available_tokens;
                    Some(Duration::from_secs_f64(deficit / self.refill_rate_per_sec))
                }
            };

            match wait {
                None => return,
                Some(duration) => sleep(duration).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_never_blocks() {
        let limiter = RateLimiter::new(0.3);
        tokio::time::timeout(Duration::from_millis(50), limiter.accept())
            .await
            .expect("first accept should not block");
    }

    #[tokio::test]
    async fn second_call_blocks_until_refill() {
        let limiter = RateLimiter::new(100.0);
        limiter.accept().await;
        let start = Instant::now();
        limiter.accept().await;
        assert!(start.elapsed() >= Duration::from_millis(1));
    }
}
