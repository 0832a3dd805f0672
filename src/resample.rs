//! Temporal Resampler
//!
//! Collapses sub-monthly observations into calendar-month buckets. Each
//! observation goes to the month containing its date, so a week that starts
//! on the 29th counts entirely toward the month it started in.

use crate::series::{Aggregation, MonthStart, MonthlySeries, Observations, RegionalMonthly, WeeklySeries};
use std::collections::BTreeMap;

/// Month bucketing with a fixed aggregation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    mode: Aggregation,
}

impl Resampler {
    pub fn new(mode: Aggregation) -> Self {
        Self { mode }
    }

    /// Summing resampler used for alert counts
    pub fn sum() -> Self {
        Self::new(Aggregation::Sum)
    }

    /// Averaging resampler used for AQI
    pub fn mean() -> Self {
        Self::new(Aggregation::Mean)
    }

    pub fn mode(&self) -> Aggregation {
        self.mode
    }

    /// Bucket `series` by calendar month
    ///
    /// Months with no observations produce no entry.
    pub fn resample<S: Observations + ?Sized>(&self, series: &S) -> MonthlySeries {
        let mut buckets: BTreeMap<MonthStart, Vec<f64>> = BTreeMap::new();
        for (date, value) in series.observations() {
            buckets
                .entry(MonthStart::containing(date))
                .or_default()
                .push(value);
        }

        buckets
            .into_iter()
            .filter_map(|(month, values)| self.mode.aggregate(&values).map(|v| (month, v)))
            .collect()
    }

    /// Monthly alert totals for one region
    pub fn resample_weekly(weekly: &WeeklySeries) -> RegionalMonthly {
        let series = Self::sum().resample(weekly);
        tracing::debug!(region = %weekly.region(), months = series.len(), "Resampled weekly alerts");
        RegionalMonthly {
            region: weekly.region(),
            series,
        }
    }
}
