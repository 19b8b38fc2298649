use crate::domains::traversal::ports::Clock;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Virtual clock: `sleep` advances time instantly. Used by the simulator and
/// in tests so multi-minute waits run in microseconds.
pub struct ManualClock {
    started: DateTime<Utc>,
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(started: DateTime<Utc>) -> Self {
        Self {
            started,
            now: Mutex::new(started),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let step = ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::zero());
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += step;
    }

    /// Virtual time passed since construction.
    pub fn elapsed(&self) -> Duration {
        self.now()
            .signed_duration_since(self.started)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
