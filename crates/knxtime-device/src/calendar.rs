//! Derived calendar queries.
//!
//! Thin read-only helpers over the manager's current local date, memoized per
//! year.

use crate::manager::TimeManager;
use knxtime_core::civil;
use knxtime_core::DateOnly;

#[derive(Debug, Default)]
pub struct Calendar {
    easter: Option<DateOnly>,
    fourth_advent: Option<DateOnly>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self, manager: &TimeManager, now_ms: u64) -> bool {
        manager.is_valid(now_ms)
    }

    /// Easter Sunday of the current local year.
    pub fn easter(&mut self, manager: &TimeManager, now_ms: u64) -> DateOnly {
        let year = manager.local_time(now_ms).year;
        if self.easter.map_or(true, |cached| cached.year != year) {
            self.easter = Some(easter_sunday(year));
        }
        self.easter.unwrap()
    }

    /// Fourth Advent Sunday of the current local year.
    pub fn fourth_advent(&mut self, manager: &TimeManager, now_ms: u64) -> DateOnly {
        let year = manager.local_time(now_ms).year;
        if self.fourth_advent.map_or(true, |cached| cached.year != year) {
            self.fourth_advent = Some(fourth_advent_sunday(year));
        }
        self.fourth_advent.unwrap()
    }
}

fn date_only(year: u16, month: u8, day: u8) -> DateOnly {
    DateOnly {
        year,
        month,
        day,
        day_of_week: civil::weekday_from_days(civil::days_from_civil(year as i32, month, day)),
    }
}

/// Gaussian computus with the two classical corrections.
pub fn easter_sunday(year: u16) -> DateOnly {
    let year = year as i32;
    let a = year % 19;
    let b = year % 4;
    let c = year % 7;

    let k = year / 100;
    let q = k / 4;
    let p = (8 * k + 13) / 25;
    let egz = (38 - (k - q) + p).rem_euclid(30);
    let m = (53 - egz) % 30;
    let n = (4 + k - q) % 7;

    let d = (19 * a + m) % 30;
    let e = (2 * b + 4 * c + 6 * d + n) % 7;

    if 22 + d + e <= 31 {
        date_only(year as u16, 3, (22 + d + e) as u8)
    } else {
        let mut day = d + e - 9;
        if day == 26 {
            day = 19;
        } else if day == 25 && d == 28 && a > 10 {
            day = 18;
        }
        date_only(year as u16, 4, day as u8)
    }
}

/// December 24 minus its weekday offset (Sunday = 0).
pub fn fourth_advent_sunday(year: u16) -> DateOnly {
    let weekday = civil::weekday_from_days(civil::days_from_civil(year as i32, 12, 24));
    date_only(year, 12, 24 - weekday)
}
