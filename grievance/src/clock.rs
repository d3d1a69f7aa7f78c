//! Clock abstraction for deadline computation and breach checks.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests: start it somewhere, advance it explicitly.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().expect("clock lock poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("clock lock poisoned");
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("clock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(25));
        assert_eq!(clock.now(), start + Duration::hours(25));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
