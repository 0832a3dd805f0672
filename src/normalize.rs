//! Regional Normalizer
//!
//! Turns raw `(year, week, count)` alert rows for one region into a
//! `WeeklySeries` keyed by the Monday of each ISO week:
//!
//! 1. drop rows outside the configured year window (silently)
//! 2. resolve `(year, week)` as ISO year/week; invalid pairs are logged and dropped
//! 3. sum counts that land on the same week

use crate::series::{iso_week_monday, RawAlertRecord, RecordError, Region, WeeklySeries, YearRange};

/// Builds weekly series from raw alert rows
#[derive(Debug, Clone, Copy)]
pub struct RegionalNormalizer {
    region: Region,
    years: YearRange,
}

/// Normalizer output plus what was dropped on the way
#[derive(Debug, Clone)]
pub struct NormalizedRegion {
    pub weekly: WeeklySeries,
    pub out_of_range: usize,
    pub invalid_weeks: usize,
}

impl RegionalNormalizer {
    pub fn new(region: Region, years: YearRange) -> Self {
        Self { region, years }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Build the weekly series for this region
    ///
    /// Records tagged with another region are ignored.
    pub fn normalize(&self, records: &[RawAlertRecord]) -> NormalizedRegion {
        let mut weekly = WeeklySeries::new(self.region);
        let mut out_of_range = 0;
        let mut invalid_weeks = 0;

        for record in records.iter().filter(|r| r.region == self.region) {
            if !self.years.contains(record.year) {
                out_of_range += 1;
                continue;
            }

            match iso_week_monday(record.year, record.iso_week) {
                Some(monday) => weekly.add(monday, record.count),
                None => {
                    let err = RecordError::InvalidIsoWeek {
                        region: self.region,
                        year: record.year,
                        week: record.iso_week,
                    };
                    tracing::warn!(
                        region = %self.region,
                        year = record.year,
                        week = record.iso_week,
                        "Dropping alert record: {}",
                        err
                    );
                    invalid_weeks += 1;
                }
            }
        }

        tracing::info!(
            region = %self.region,
            weeks = weekly.len(),
            alerts = weekly.total(),
            out_of_range,
            invalid_weeks,
            "Normalized weekly alert series"
        );

        NormalizedRegion {
            weekly,
            out_of_range,
            invalid_weeks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Weekday};

    fn rec(year: i32, iso_week: u32, count: u64) -> RawAlertRecord {
        RawAlertRecord {
            region: Region::Ontario,
            year,
            iso_week,
            count,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_sums_duplicate_weeks() {
        let normalizer = RegionalNormalizer::new(Region::Ontario, YearRange::default());
        let out = normalizer.normalize(&[rec(2020, 2, 3), rec(2020, 1, 5), rec(2020, 2, 4)]);

        let weeks: Vec<_> = out.weekly.iter().collect();
        assert_eq!(weeks, vec![(date(2019, 12, 30), 5), (date(2020, 1, 6), 7)]);
    }

    #[test]
    fn test_normalize_drops_out_of_range_years() {
        let normalizer = RegionalNormalizer::new(Region::Ontario, YearRange::default());
        let out = normalizer.normalize(&[rec(2009, 40, 1), rec(2010, 1, 2), rec(2021, 52, 3), rec(2022, 1, 4)]);

        assert_eq!(out.out_of_range, 2);
        assert_eq!(out.weekly.len(), 2);
        assert_eq!(out.weekly.total(), 5);
    }

    #[test]
    fn test_normalize_drops_invalid_iso_weeks() {
        let normalizer = RegionalNormalizer::new(Region::Ontario, YearRange::default());
        // 2021 has no week 53; 2020 does
        let out = normalizer.normalize(&[rec(2021, 53, 9), rec(2020, 53, 1), rec(2020, 0, 1)]);

        assert_eq!(out.invalid_weeks, 2);
        assert_eq!(out.weekly.get(date(2020, 12, 28)), Some(1));
    }

    #[test]
    fn test_normalize_ignores_other_regions() {
        let normalizer = RegionalNormalizer::new(Region::Quebec, YearRange::default());
        let mut quebec = rec(2020, 10, 2);
        quebec.region = Region::Quebec;
        let out = normalizer.normalize(&[rec(2020, 10, 5), quebec]);

        assert_eq!(out.weekly.total(), 2);
        assert_eq!(out.weekly.region(), Region::Quebec);
    }

    #[test]
    fn test_all_weeks_are_mondays_and_strictly_increasing() {
        let normalizer = RegionalNormalizer::new(Region::Ontario, YearRange::default());
        let records: Vec<_> = (2010..=2021)
            .flat_map(|y| (1..=53).map(move |w| rec(y, w, 1)))
            .collect();
        let out = normalizer.normalize(&records);

        let dates: Vec<_> = out.weekly.iter().map(|(d, _)| d).collect();
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Mon));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        // 2015 and 2020 are the long ISO years in the window
        assert_eq!(out.invalid_weeks, 10);
    }
}
