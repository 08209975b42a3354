//! Time of week carried by labels for time-dependent costing

use chrono::{Datelike, NaiveDateTime, Timelike};

pub const SECONDS_PER_DAY: u32 = 24 * 3600;
pub const SECONDS_PER_WEEK: u32 = 7 * SECONDS_PER_DAY;

/// Seconds since Monday 00:00 local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeInfo {
    second_of_week: u32,
}

impl TimeInfo {
    pub fn from_second_of_week(seconds: u32) -> Self {
        Self {
            second_of_week: seconds % SECONDS_PER_WEEK,
        }
    }

    pub fn from_datetime(value: NaiveDateTime) -> Self {
        let day = value.weekday().num_days_from_monday();
        Self::from_second_of_week(day * SECONDS_PER_DAY + value.num_seconds_from_midnight())
    }

    pub fn second_of_week(&self) -> u32 {
        self.second_of_week
    }

    pub fn second_of_day(&self) -> u32 {
        self.second_of_week % SECONDS_PER_DAY
    }

    pub fn hour(&self) -> u32 {
        self.second_of_day() / 3600
    }

    /// Time after travelling `secs` forward
    pub fn forward(&self, secs: f32) -> Self {
        let delta = (secs.max(0.0).round() as u64 % SECONDS_PER_WEEK as u64) as u32;
        Self::from_second_of_week(self.second_of_week + delta)
    }

    /// Time `secs` earlier, used by reverse searches
    pub fn reverse(&self, secs: f32) -> Self {
        let delta = (secs.max(0.0).round() as u64 % SECONDS_PER_WEEK as u64) as u32;
        Self::from_second_of_week(self.second_of_week + SECONDS_PER_WEEK - delta)
    }
}
