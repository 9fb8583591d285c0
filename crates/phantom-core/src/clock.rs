use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Wall-clock source. Expiry timestamps are compared against this, never
/// against the monotonic timers that drive countdowns.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Whole seconds left until `expires_at`, rounded up. Zero once it has passed.
pub fn seconds_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let ms = (expires_at - now).num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    let secs = (ms + 999) / 1000;
    u32::try_from(secs).unwrap_or(u32::MAX)
}
