//! County-level AQI
//!
//! Monthly mean AQI per county, derived from the daily readings
//! independently of the statewide series. The summaries here feed the map
//! and panel renderers, which live outside this crate: a county's average
//! for a year or a single month, the worst counties, and Upstate vs
//! Downstate monthly averages.

use crate::resample::Resampler;
use crate::series::{DailySeries, MonthStart};
use std::collections::{BTreeMap, HashSet};

/// Mean AQI keyed by (county, month)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountyAqiSeries {
    values: BTreeMap<String, BTreeMap<MonthStart, f64>>,
}

/// Upstate/Downstate means for one month; a side with no counties reporting is `None`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionalAverage {
    pub downstate: Option<f64>,
    pub upstate: Option<f64>,
}

impl CountyAqiSeries {
    /// Resample each county's daily readings to monthly means
    pub fn from_daily(by_county: &BTreeMap<String, DailySeries>) -> Self {
        let resampler = Resampler::mean();
        let values = by_county
            .iter()
            .map(|(county, daily)| {
                (
                    county.trim().to_string(),
                    resampler.resample(daily).iter().collect(),
                )
            })
            .collect();

        Self { values }
    }

    pub fn insert(&mut self, county: impl Into<String>, month: MonthStart, aqi: f64) {
        self.values.entry(county.into()).or_default().insert(month, aqi);
    }

    pub fn get(&self, county: &str, month: MonthStart) -> Option<f64> {
        self.values.get(county).and_then(|m| m.get(&month)).copied()
    }

    /// Rows ordered by county, then month
    pub fn iter(&self) -> impl Iterator<Item = (&str, MonthStart, f64)> + '_ {
        self.values
            .iter()
            .flat_map(|(county, months)| months.iter().map(move |(m, v)| (county.as_str(), *m, *v)))
    }

    pub fn counties(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-county mean over a year, or over one month of it
    ///
    /// Counties with no data in the period are omitted.
    pub fn period_means(&self, year: i32, month: Option<u32>) -> BTreeMap<String, f64> {
        self.values
            .iter()
            .filter_map(|(county, months)| {
                let selected: Vec<f64> = months
                    .iter()
                    .filter(|(m, _)| m.year() == year && month.map_or(true, |mo| m.month() == mo))
                    .map(|(_, v)| *v)
                    .collect();
                if selected.is_empty() {
                    return None;
                }
                let mean = selected.iter().sum::<f64>() / selected.len() as f64;
                Some((county.clone(), mean))
            })
            .collect()
    }

    /// Per-month Upstate and Downstate averages of county means
    pub fn regional_averages(&self, downstate: &[String]) -> BTreeMap<MonthStart, RegionalAverage> {
        let downstate: HashSet<&str> = downstate.iter().map(|c| c.trim()).collect();
        let mut sums: BTreeMap<MonthStart, [(f64, usize); 2]> = BTreeMap::new();

        for (county, month, aqi) in self.iter() {
            let side = usize::from(!downstate.contains(county));
            let slot = &mut sums.entry(month).or_insert([(0.0, 0); 2])[side];
            slot.0 += aqi;
            slot.1 += 1;
        }

        let mean = |(sum, n): (f64, usize)| (n > 0).then(|| sum / n as f64);
        sums.into_iter()
            .map(|(month, [down, up])| {
                (
                    month,
                    RegionalAverage {
                        downstate: mean(down),
                        upstate: mean(up),
                    },
                )
            })
            .collect()
    }
}

/// The `n` counties with the highest mean AQI, worst first
pub fn top_counties(means: &BTreeMap<String, f64>, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = means.iter().map(|(c, v)| (c.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(y: i32, m: u32) -> MonthStart {
        MonthStart::from_ym(y, m).unwrap()
    }

    fn daily(points: &[(i32, u32, u32, f64)]) -> DailySeries {
        points
            .iter()
            .map(|(y, m, d, v)| (NaiveDate::from_ymd_opt(*y, *m, *d).unwrap(), *v))
            .collect()
    }

    fn sample() -> CountyAqiSeries {
        let mut by_county = BTreeMap::new();
        by_county.insert("Albany".to_string(), daily(&[(2020, 1, 1, 40.0), (2020, 1, 2, 60.0), (2020, 2, 1, 30.0)]));
        by_county.insert("Kings".to_string(), daily(&[(2020, 1, 5, 80.0), (2021, 1, 5, 20.0)]));
        by_county.insert("Queens ".to_string(), daily(&[(2020, 2, 5, 70.0)]));
        CountyAqiSeries::from_daily(&by_county)
    }

    #[test]
    fn test_monthly_county_means() {
        let series = sample();
        assert_eq!(series.get("Albany", month(2020, 1)), Some(50.0));
        assert_eq!(series.get("Albany", month(2020, 3)), None);
        assert_eq!(series.get("Queens", month(2020, 2)), Some(70.0));
        assert_eq!(series.len(), 5);

        let first: Vec<_> = series.iter().take(2).map(|(c, m, _)| (c.to_string(), m)).collect();
        assert_eq!(
            first,
            vec![("Albany".to_string(), month(2020, 1)), ("Albany".to_string(), month(2020, 2))]
        );
    }

    #[test]
    fn test_period_means() {
        let series = sample();

        let year = series.period_means(2020, None);
        assert_eq!(year["Albany"], 40.0);
        assert_eq!(year["Kings"], 80.0);
        assert_eq!(year.len(), 3);

        let feb = series.period_means(2020, Some(2));
        assert_eq!(feb.len(), 2);
        assert!(!feb.contains_key("Kings"));
    }

    #[test]
    fn test_top_counties() {
        let means = sample().period_means(2020, None);
        let top = top_counties(&means, 2);
        assert_eq!(top, vec![("Kings".to_string(), 80.0), ("Queens".to_string(), 70.0)]);
    }

    #[test]
    fn test_regional_averages() {
        let downstate = vec!["Kings".to_string(), "Queens".to_string()];
        let averages = sample().regional_averages(&downstate);

        assert_eq!(
            averages[&month(2020, 1)],
            RegionalAverage {
                downstate: Some(80.0),
                upstate: Some(50.0)
            }
        );
        assert_eq!(averages[&month(2020, 2)].downstate, Some(70.0));
        assert_eq!(averages[&month(2021, 1)].upstate, None);
    }
}
