//! Test helpers for driving the countdown on tokio's paused clock.

use chrono::{DateTime, Utc};

use crate::attempts::TimeSource;

/// Wall clock that advances with tokio's (pausable) monotonic clock.
pub struct TokioClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    #[must_use]
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl TimeSource for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.origin;
        self.base + chrono::Duration::from_std(elapsed).unwrap_or_default()
    }
}
