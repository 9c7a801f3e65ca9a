//! Minimum-interval rate limiter.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Enforces a minimum gap between consecutive calls to [`RateLimiter::wait`].
///
/// The first call never sleeps. Nominatim's usage policy allows at most one
/// request per second, which is the default interval.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Sleep until at least `interval` has passed since the previous call.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                let delay = self.interval - elapsed;
                trace!(delay_ms = delay.as_millis() as u64, "rate limiting");
                tokio::time::sleep(delay).await;
            }
        }

        *last = Some(Instant::now());
    }
}
