//! As-of month/year bucketing.
//!
//! Every computation is anchored on a supplied "today" rather than the system
//! clock, so tests and back-dated reports can fix the date. `Clock` is the
//! injection seam; `TimeWindow` holds the resolved date.

use std::ops::RangeInclusive;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Source of "today".
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

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// A calendar month, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AsOf {
    pub year: i32,
    pub month: u32,
}

impl AsOf {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(MetricsError::invalid(format!("month {} outside 1..12", month)));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month before this one, rolling back across January.
    pub fn previous(self) -> Self {
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

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for AsOf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Date helpers anchored on an injected "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    today: NaiveDate,
}

impl TimeWindow {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.today())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// 1..=12
    pub fn current_month(&self) -> u32 {
        self.today.month()
    }

    pub fn current_year(&self) -> i32 {
        self.today.year()
    }

    pub fn as_of(&self) -> AsOf {
        AsOf::of(self.today)
    }

    pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
        let (first, last) = Self::month_range(year, month)?;
        Ok((last - first).num_days() as u32 + 1)
    }

    /// First and last calendar day of the month.
    pub fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| MetricsError::invalid(format!("no such month {}-{}", year, month)))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| MetricsError::invalid(format!("month after {}-{} out of range", year, month)))?;
        let last = next
            .pred_opt()
            .ok_or_else(|| MetricsError::invalid(format!("no last day for {}-{}", year, month)))?;
        Ok((first, last))
    }

    /// Months elapsed so far this year: `1..=as_of_month`.
    pub fn ytd_months(as_of_month: u32) -> Result<RangeInclusive<u32>> {
        if !(1..=12).contains(&as_of_month) {
            return Err(MetricsError::invalid(format!(
                "as-of month {} outside 1..12",
                as_of_month
            )));
        }
        Ok(1..=as_of_month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fixed_clock_drives_window() {
        let window = TimeWindow::from_clock(&FixedClock(date(2024, 3, 15)));
        assert_eq!(window.current_month(), 3);
        assert_eq!(window.current_year(), 2024);
        assert_eq!(window.as_of(), AsOf { year: 2024, month: 3 });
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(TimeWindow::days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(TimeWindow::days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(TimeWindow::days_in_month(2024, 12).unwrap(), 31);
        assert_eq!(TimeWindow::days_in_month(2024, 4).unwrap(), 30);
    }

    #[test]
    fn test_month_range_december() {
        let (first, last) = TimeWindow::month_range(2024, 12).unwrap();
        assert_eq!(first, date(2024, 12, 1));
        assert_eq!(last, date(2024, 12, 31));
    }

    #[test]
    fn test_month_range_rejects_month_13() {
        assert!(matches!(
            TimeWindow::month_range(2024, 13),
            Err(MetricsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ytd_months() {
        assert_eq!(TimeWindow::ytd_months(3).unwrap(), 1..=3);
        assert!(TimeWindow::ytd_months(0).is_err());
        assert!(TimeWindow::ytd_months(13).is_err());
    }

    #[test]
    fn test_previous_rolls_over_january() {
        let jan = AsOf::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), AsOf { year: 2023, month: 12 });
        assert_eq!(jan.previous().previous(), AsOf { year: 2023, month: 11 });
    }

    #[test]
    fn test_as_of_contains() {
        let march = AsOf::new(2024, 3).unwrap();
        assert!(march.contains(date(2024, 3, 31)));
        assert!(!march.contains(date(2023, 3, 31)));
        assert_eq!(march.to_string(), "2024-03");
    }
}
