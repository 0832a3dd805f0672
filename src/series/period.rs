//! Date and period utilities
//!
//! Everything in the pipeline is keyed by one of two kinds of date:
//! - the Monday that starts an ISO 8601 week (weekly alert data)
//! - the first calendar day of a month (`MonthStart`, everything after resampling)

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monday of ISO week `week` of ISO year `year`.
///
/// Returns `None` when the pair does not name a real ISO week, e.g. week 53
/// of a year that only has 52 weeks, or week 0.
pub fn iso_week_monday(year: i32, week: u32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// First calendar day of a month
///
/// The inner date always has `day() == 1`; the only way to build one is
/// through constructors that enforce that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "NaiveDate", into = "NaiveDate")]
pub struct MonthStart(NaiveDate);

impl MonthStart {
    /// Month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        // day 1 of an existing date's month always exists
        Self(date.with_day(1).unwrap_or(date))
    }

    /// Build from a calendar year and month (1-12)
    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Parse a `YYYY-MM-DD` string that must already be a month start
    pub fn parse(s: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()?;
        Self::try_from(date).ok()
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Month `n` months later
    pub fn offset(&self, n: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(n)).map(Self)
    }

    /// Every month start from `self` to `end` inclusive
    pub fn through(self, end: MonthStart) -> impl Iterator<Item = MonthStart> {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let current = next.filter(|m| *m <= end)?;
            next = current.offset(1);
            Some(current)
        })
    }
}

impl TryFrom<NaiveDate> for MonthStart {
    type Error = String;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        if date.day() == 1 {
            Ok(Self(date))
        } else {
            Err(format!("{} is not the first day of a month", date))
        }
    }
}

impl From<MonthStart> for NaiveDate {
    fn from(month: MonthStart) -> Self {
        month.0
    }
}

impl fmt::Display for MonthStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Inclusive range of calendar years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Create a range; `None` if `start > end`
    pub fn new(start: i32, end: i32) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.year())
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 2010,
            end: 2021,
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
