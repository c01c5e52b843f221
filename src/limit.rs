//! Requests-per-minute throttling for upstream model calls.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rate_guard::{RateLimit, StdTokenBucket, TokenBucketBuilder};

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Token bucket shared by every request that reaches the model provider.
pub struct RateLimiter {
    bucket: Mutex<StdTokenBucket>,
}

impl RateLimiter {
    /// Creates a limiter allowing `rpm` requests per minute.
    ///
    /// Returns `None` if the bucket cannot be built.
    pub fn per_minute(rpm: u32) -> Option<Self> {
        let capacity = u64::from(rpm.max(1));
        let refill_interval = Duration::from_secs_f64(60.0 / capacity as f64);

        TokenBucketBuilder::builder()
            .capacity(capacity)
            .refill_amount(1_u64)
            .refill_every(refill_interval)
            .with_time(rate_guard::StdTimeSource::new())
            .with_precision::<rate_guard::Nanos>()
            .build()
            .ok()
            .map(|bucket| Self {
                bucket: Mutex::new(bucket),
            })
    }

    /// Waits until a request may be sent.
    pub async fn acquire(&self) {
        loop {
            let acquired = self
                .bucket
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .try_acquire(1)
                .is_ok();
            if acquired {
                return;
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }
}
