//! Core data types for the alignment pipeline
//!
//! This module defines the fundamental types passed between stages:
//! - `Region`: the three alert-source regions
//! - `RawAlertRecord`: one row of a regional alert export
//! - `WeeklySeries`, `DailySeries`, `MonthlySeries`: date-keyed series
//! - `Aggregation`: how observations collapse into a monthly bucket

use super::period::MonthStart;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Region an alert series comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Ontario,
    Quebec,
    NewfoundlandAndLabrador,
}

impl Region {
    /// Get all regions in column order
    pub fn all() -> &'static [Region] {
        &[
            Region::Ontario,
            Region::Quebec,
            Region::NewfoundlandAndLabrador,
        ]
    }

    /// Position in `all()`
    pub fn index(&self) -> usize {
        match self {
            Region::Ontario => 0,
            Region::Quebec => 1,
            Region::NewfoundlandAndLabrador => 2,
        }
    }

    /// Column name in the merged analysis table
    pub fn column(&self) -> &'static str {
        match self {
            Region::Ontario => "Ontario_VIF",
            Region::Quebec => "Quebec_VIF",
            Region::NewfoundlandAndLabrador => "NL_VIF",
        }
    }

    /// Value written to the `Region` column of monthly tables
    pub fn label(&self) -> &'static str {
        match self {
            Region::Ontario => "Ontario",
            Region::Quebec => "Quebec",
            Region::NewfoundlandAndLabrador => "Newfoundland and Labrador",
        }
    }

    /// Short code used for file names (`monthly_on.csv`)
    pub fn code(&self) -> &'static str {
        match self {
            Region::Ontario => "on",
            Region::Quebec => "qc",
            Region::NewfoundlandAndLabrador => "nl",
        }
    }

    /// Parse from a label, column name, code or config key
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Region::all().iter().copied().find(|r| {
            s.eq_ignore_ascii_case(r.label())
                || s.eq_ignore_ascii_case(r.column())
                || s.eq_ignore_ascii_case(r.code())
                || s.eq_ignore_ascii_case(&r.to_string())
        })
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Ontario => write!(f, "ontario"),
            Region::Quebec => write!(f, "quebec"),
            Region::NewfoundlandAndLabrador => write!(f, "newfoundland_and_labrador"),
        }
    }
}

/// One row of a regional alert export, read once and never modified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAlertRecord {
    pub region: Region,
    pub year: i32,
    pub iso_week: u32,
    pub count: u64,
}

/// How to combine the observations that fall into one monthly bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Sum values (alert counts)
    Sum,
    /// Average values (AQI)
    Mean,
}

impl Aggregation {
    /// Aggregate a slice of values; `None` for an empty bucket
    pub fn aggregate(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        Some(match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
        })
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Aggregation::Sum => write!(f, "sum"),
            Aggregation::Mean => write!(f, "mean"),
        }
    }
}

/// Anything that can be viewed as dated numeric observations
///
/// Dates may repeat (several counties report on the same day); the
/// resampler buckets them all.
pub trait Observations {
    fn observations(&self) -> Box<dyn Iterator<Item = (NaiveDate, f64)> + '_>;
}

/// Weekly alert counts for one region keyed by ISO-week Monday
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySeries {
    region: Region,
    counts: BTreeMap<NaiveDate, u64>,
}

impl WeeklySeries {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            counts: BTreeMap::new(),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Add `count` to the week starting on `monday`
    pub fn add(&mut self, monday: NaiveDate, count: u64) {
        *self.counts.entry(monday).or_insert(0) += count;
    }

    pub fn get(&self, monday: NaiveDate) -> Option<u64> {
        self.counts.get(&monday).copied()
    }

    /// Weeks in strictly increasing date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.counts.iter().map(|(d, c)| (*d, *c))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl Observations for WeeklySeries {
    fn observations(&self) -> Box<dyn Iterator<Item = (NaiveDate, f64)> + '_> {
        Box::new(self.iter().map(|(d, c)| (d, c as f64)))
    }
}

/// Daily observations, possibly several per date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    points: Vec<(NaiveDate, f64)>,
}

impl DailySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, date: NaiveDate, value: f64) {
        self.points.push((date, value));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<(NaiveDate, f64)> for DailySeries {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, f64)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl Observations for DailySeries {
    fn observations(&self) -> Box<dyn Iterator<Item = (NaiveDate, f64)> + '_> {
        Box::new(self.points.iter().copied())
    }
}

/// One aggregate value per month that had observations
///
/// Months without observations are absent, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlySeries {
    values: BTreeMap<MonthStart, f64>,
}

impl MonthlySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, month: MonthStart, value: f64) {
        self.values.insert(month, value);
    }

    pub fn get(&self, month: MonthStart) -> Option<f64> {
        self.values.get(&month).copied()
    }

    pub fn contains(&self, month: MonthStart) -> bool {
        self.values.contains_key(&month)
    }

    /// Months in increasing order
    pub fn months(&self) -> impl Iterator<Item = MonthStart> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonthStart, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_month(&self) -> Option<MonthStart> {
        self.values.keys().next().copied()
    }

    pub fn last_month(&self) -> Option<MonthStart> {
        self.values.keys().next_back().copied()
    }
}

impl FromIterator<(MonthStart, f64)> for MonthlySeries {
    fn from_iter<T: IntoIterator<Item = (MonthStart, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Observations for MonthlySeries {
    fn observations(&self) -> Box<dyn Iterator<Item = (NaiveDate, f64)> + '_> {
        Box::new(self.iter().map(|(m, v)| (m.date(), v)))
    }
}

/// Monthly alert series tagged with its region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalMonthly {
    pub region: Region,
    pub series: MonthlySeries,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_region_names() {
        assert_eq!(Region::NewfoundlandAndLabrador.column(), "NL_VIF");
        assert_eq!(Region::Quebec.label(), "Quebec");
        assert_eq!(Region::from_str("Newfoundland and Labrador"), Some(Region::NewfoundlandAndLabrador));
        assert_eq!(Region::from_str("on"), Some(Region::Ontario));
        assert_eq!(Region::from_str("Quebec_VIF"), Some(Region::Quebec));
        assert_eq!(Region::from_str("manitoba"), None);
    }

    #[test]
    fn test_region_serde_keys() {
        let json = serde_json::to_string(&Region::NewfoundlandAndLabrador).unwrap();
        assert_eq!(json, "\"newfoundland_and_labrador\"");
    }

    #[test]
    fn test_aggregation() {
        let values = vec![2.0, 4.0, 9.0];
        assert_eq!(Aggregation::Sum.aggregate(&values), Some(15.0));
        assert_eq!(Aggregation::Mean.aggregate(&values), Some(5.0));
        assert_eq!(Aggregation::Sum.aggregate(&[]), None);
        assert_eq!(Aggregation::Mean.aggregate(&[]), None);
    }

    #[test]
    fn test_weekly_series_accumulates_same_week() {
        let mut weekly = WeeklySeries::new(Region::Ontario);
        weekly.add(date(2020, 1, 6), 3);
        weekly.add(date(2020, 1, 6), 4);
        weekly.add(date(2019, 12, 30), 1);

        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly.get(date(2020, 1, 6)), Some(7));
        let dates: Vec<_> = weekly.iter().map(|(d, _)| d).collect();
        assert_eq!(dates, vec![date(2019, 12, 30), date(2020, 1, 6)]);
        assert_eq!(weekly.total(), 8);
    }

    #[test]
    fn test_monthly_series_absence() {
        let jan = MonthStart::from_ym(2020, 1).unwrap();
        let feb = MonthStart::from_ym(2020, 2).unwrap();
        let series: MonthlySeries = vec![(jan, 8.0)].into_iter().collect();

        assert_eq!(series.get(jan), Some(8.0));
        assert_eq!(series.get(feb), None);
        assert!(!series.contains(feb));
    }
}
