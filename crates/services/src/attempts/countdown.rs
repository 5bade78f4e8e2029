use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::Clock;

/// Wall-clock source the countdown compares against the attempt expiry.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl TimeSource for Clock {
    fn now(&self) -> DateTime<Utc> {
        Clock::now(self)
    }
}

/// Periodic countdown towards an absolute expiry instant.
///
/// Remaining time is recomputed from `expiry - now` on every tick, so it stays
/// correct across suspension. Fires `on_expired` at most once, then stops.
/// Dropping or cancelling the countdown aborts the task at its next await.
pub(crate) struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    pub(crate) fn spawn<T, E>(
        expiry: DateTime<Utc>,
        clock: Arc<dyn TimeSource>,
        tick: Duration,
        mut on_tick: T,
        on_expired: E,
    ) -> Self
    where
        T: FnMut(Duration) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            loop {
                let remaining = expiry - clock.now();
                if remaining <= chrono::Duration::zero() {
                    debug!(%expiry, "countdown reached expiry");
                    on_expired();
                    return;
                }
                on_tick(remaining.to_std().unwrap_or_default());
                tokio::time::sleep(tick).await;
            }
        });
        Self { handle }
    }

    pub(crate) fn cancel(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
