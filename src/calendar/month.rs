//! Month keys and week arithmetic
//!
//! `MonthKey` identifies a calendar month and is the period key used by
//! both the grid builder and the aggregation reducer.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month (year + 1-based month)
///
/// Orders chronologically, displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Create a month key. Returns `None` if `month` is not in 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    /// Number of days in the month
    pub fn days(&self) -> u32 {
        self.last_day().day()
    }

    /// Whether `date` falls in this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The following month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// All twelve months of `year`, January first
    pub fn year_months(year: i32) -> Vec<MonthKey> {
        (1..=12).map(|month| MonthKey { year, month }).collect()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error parsing a `YYYY-MM` month key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid month '{0}', expected YYYY-MM")]
pub struct ParseMonthError(pub String);

impl FromStr for MonthKey {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        MonthKey::new(year, month).ok_or_else(err)
    }
}

/// Start of the week containing `date`
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = days_since(date.weekday(), week_start);
    date.checked_sub_days(Days::new(offset as u64)).unwrap_or(date)
}

/// End (last day) of the week containing `date`
pub fn end_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = 6 - days_since(date.weekday(), week_start);
    date.checked_add_days(Days::new(offset as u64)).unwrap_or(date)
}

/// Days from `week_start` forward to `day` (0..=6)
fn days_since(day: Weekday, week_start: Weekday) -> u32 {
    (7 + day.num_days_from_monday() - week_start.num_days_from_monday()) % 7
}
