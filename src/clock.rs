//! Injected time source
//!
//! All "today", "current hour", and per-day seeding decisions flow through
//! a single substitutable clock, so date-relative branching (past / today /
//! future) is deterministic under test.

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

/// Source of the engine's notion of "now"
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current hour of day, 0-23.
    fn current_hour(&self) -> usize {
        self.now().hour() as usize
    }
}

/// Wall clock in local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fixed clock for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let clock = FixedClock(now);
        assert_eq!(clock.now(), now);
        assert_eq!(clock.today(), now.date());
        assert_eq!(clock.current_hour(), 14);
    }
}
