//! Clock abstraction for cache expiry and run timestamps.
//!
//! The cache and the run engine never read ambient time directly; they go
//! through a [`Clock`] handle so tests can drive expiry with a manual clock
//! instead of real sleeps.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current UNIX time in seconds (never negative).
    fn now_unix(&self) -> u64 {
        self.now().timestamp().max(0) as u64
    }
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
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

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().expect("manual clock mutex poisoned");
        *now += chrono::Duration::seconds(secs);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().expect("manual clock mutex poisoned");
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock mutex poisoned")
    }
}
