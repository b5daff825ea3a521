//! Time source for polling loops.
//!
//! Pollers never read the system clock directly; they ask a [`Clock`] for
//! the current time and to sleep between iterations, so tests can run a
//! whole timeout schedule without waiting.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Wall-clock time since the Unix epoch. Comparable with the
    /// `created_at` timestamps the cluster API reports.
    fn now(&self) -> Duration;

    /// Suspend the current poll loop.
    async fn sleep(&self, duration: Duration);

    /// Time elapsed since `start`, saturating at zero.
    fn elapsed_since(&self, start: Duration) -> Duration {
        self.now().saturating_sub(start)
    }
}

/// The real clock: `SystemTime` plus `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Age of a Unix-seconds timestamp relative to `reference`, zero if the
/// timestamp lies in the future.
pub fn age_of(created_at: u64, reference: Duration) -> Duration {
    reference.saturating_sub(Duration::from_secs(created_at))
}
