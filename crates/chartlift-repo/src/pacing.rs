//! Fixed-interval request pacing
//!
//! The app store processes every uploaded package synchronously, so uploads
//! are spaced by a constant interval instead of being sent back to back.

use std::time::Duration;

use tokio::time::Instant;

/// Default spacing between two upload calls
pub const DEFAULT_PACE: Duration = Duration::from_millis(200);

/// Static rate limiter: at most one call per interval
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// A pacer that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the interval since the previous call has elapsed
    ///
    /// The first call returns immediately.
    pub async fn ready(&mut self) {
        if let Some(last) = self.last {
            let next = last + self.interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(DEFAULT_PACE)
    }
}
