//! Current-date source used for overdue evaluation and display classification.

use chrono::{Days, Local, NaiveDate};
use std::sync::Mutex;

/// Port for reading today's calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock for simulated time.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = today;
    }

    /// Moves the clock forward by `days`, saturating at the calendar maximum.
    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *today = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use chrono::NaiveDate;

    #[test]
    fn manual_clock_advances_by_whole_days() {
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        clock.set(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
    }
}
