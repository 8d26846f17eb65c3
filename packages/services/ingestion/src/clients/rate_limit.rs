use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota};
use tokio_util::sync::CancellationToken;

use crate::models::*;

pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// Process-wide pacing for upstream calls. Burst equals the per-second rate.
pub struct RateLimiter {
    rate: NonZeroU32,
    limiter: DefaultDirectRateLimiter,
}

impl RateLimiter {
    /// A rate of zero falls back to [`DEFAULT_REQUESTS_PER_SECOND`].
    pub fn new(requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second)
            .or(NonZeroU32::new(DEFAULT_REQUESTS_PER_SECOND))
            .unwrap_or(NonZeroU32::MIN);
        Self {
            rate,
            limiter: governor::RateLimiter::direct(Quota::per_second(rate).allow_burst(rate)),
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate.get()
    }

    /// Wait for one cell. Returns `Cancelled` if the token fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(IngestionError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }
}
