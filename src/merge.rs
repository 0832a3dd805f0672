//! Series Merger
//!
//! One join implementation with two policies:
//! - `JoinMode::Outer` unions the regional alert series; a region with no
//!   entry for a month gets an explicit null
//! - `JoinMode::Inner` merges that union with statewide AQI, keeping only
//!   months present on both sides
//!
//! Nulls are `None`, never zero. A month with no alerts reported is not the
//! same as a month with zero alerts.

use crate::series::{MonthStart, MonthlySeries, PipelineError, PipelineResult, Region, RegionalMonthly};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Column holding statewide AQI in merged tables
pub const AQI_COLUMN: &str = "NY_AQI";

/// Which dates survive a join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    /// Union of dates; missing cells are null
    Outer,
    /// Intersection of dates
    Inner,
}

/// Month-keyed table of nullable columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    columns: Vec<String>,
    rows: BTreeMap<MonthStart, Vec<Option<f64>>>,
}

impl WideTable {
    /// Single-column table from a monthly series
    pub fn from_series(column: impl Into<String>, series: &MonthlySeries) -> Self {
        Self {
            columns: vec![column.into()],
            rows: series.iter().map(|(m, v)| (m, vec![Some(v)])).collect(),
        }
    }

    /// Table from explicit columns and rows; every row must match the column count
    pub fn from_rows(
        columns: Vec<String>,
        rows: BTreeMap<MonthStart, Vec<Option<f64>>>,
    ) -> PipelineResult<Self> {
        if let Some((month, row)) = rows.iter().find(|(_, r)| r.len() != columns.len()) {
            return Err(PipelineError::InvalidTable {
                source_name: "wide table".to_string(),
                reason: format!(
                    "row {} has {} values for {} columns",
                    month,
                    row.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Join two tables on month with the given policy
    ///
    /// Column names of `self` and `other` must be distinct.
    pub fn join(&self, other: &WideTable, mode: JoinMode) -> WideTable {
        debug_assert!(
            other.columns.iter().all(|c| !self.columns.contains(c)),
            "join with overlapping columns"
        );

        let dates: BTreeSet<MonthStart> = match mode {
            JoinMode::Outer => self.rows.keys().chain(other.rows.keys()).copied().collect(),
            JoinMode::Inner => self
                .rows
                .keys()
                .filter(|m| other.rows.contains_key(m))
                .copied()
                .collect(),
        };

        let rows = dates
            .into_iter()
            .map(|month| {
                let mut row = Vec::with_capacity(self.columns.len() + other.columns.len());
                match self.rows.get(&month) {
                    Some(values) => row.extend_from_slice(values),
                    None => row.resize(self.columns.len(), None),
                }
                match other.rows.get(&month) {
                    Some(values) => row.extend_from_slice(values),
                    None => row.resize(row.len() + other.columns.len(), None),
                }
                (month, row)
            })
            .collect();

        WideTable {
            columns: self.columns.iter().chain(&other.columns).cloned().collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Months in increasing order
    pub fn dates(&self) -> impl Iterator<Item = MonthStart> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (MonthStart, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(m, r)| (*m, r.as_slice()))
    }

    pub fn value(&self, month: MonthStart, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(&month).and_then(|r| r[idx])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One analysis-ready month
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedRow {
    pub date: MonthStart,
    alerts: [Option<f64>; 3],
    pub aqi: f64,
}

impl MergedRow {
    pub fn new(date: MonthStart, alerts: [Option<f64>; 3], aqi: f64) -> Self {
        Self { date, alerts, aqi }
    }

    /// Alert total for `region`, `None` if the region reported nothing
    pub fn alert(&self, region: Region) -> Option<f64> {
        self.alerts[region.index()]
    }
}

/// Alert union inner-joined with AQI; every row has an AQI value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    rows: Vec<MergedRow>,
}

impl MergedTable {
    /// Convert a joined table holding the three region columns and `NY_AQI`
    pub fn from_wide(table: &WideTable) -> PipelineResult<Self> {
        let missing = |column: &str| PipelineError::missing_column("merged table", column);

        let region_idx = [
            table.column_index(Region::Ontario.column()).ok_or_else(|| missing(Region::Ontario.column()))?,
            table.column_index(Region::Quebec.column()).ok_or_else(|| missing(Region::Quebec.column()))?,
            table
                .column_index(Region::NewfoundlandAndLabrador.column())
                .ok_or_else(|| missing(Region::NewfoundlandAndLabrador.column()))?,
        ];
        let aqi_idx = table.column_index(AQI_COLUMN).ok_or_else(|| missing(AQI_COLUMN))?;

        let rows = table
            .rows()
            .map(|(date, values)| {
                let aqi = values[aqi_idx].ok_or_else(|| PipelineError::InvalidTable {
                    source_name: "merged table".to_string(),
                    reason: format!("{} is null at {}", AQI_COLUMN, date),
                })?;
                Ok(MergedRow {
                    date,
                    alerts: region_idx.map(|i| values[i]),
                    aqi,
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self { rows })
    }

    pub fn from_rows(mut rows: Vec<MergedRow>) -> Self {
        rows.sort_by_key(|r| r.date);
        rows.dedup_by_key(|r| r.date);
        Self { rows }
    }

    /// Rows in increasing date order
    pub fn rows(&self) -> &[MergedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn alert_column(&self, region: Region) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.alert(region)).collect()
    }

    pub fn aqi_column(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.aqi).collect()
    }

    /// Rows falling in one calendar year
    pub fn for_year(&self, year: i32) -> MergedTable {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| r.date.year() == year)
                .copied()
                .collect(),
        }
    }
}

/// Joins monthly series into wide tables
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesMerger;

impl SeriesMerger {
    /// Outer-join the regional alert series
    ///
    /// Always yields the three region columns in `Region::all()` order; a
    /// region absent from `regional` contributes an all-null column.
    pub fn union_regions(&self, regional: &[RegionalMonthly]) -> WideTable {
        let empty = MonthlySeries::new();
        let table = Region::all()
            .iter()
            .map(|region| {
                let series = regional
                    .iter()
                    .find(|r| r.region == *region)
                    .map(|r| &r.series)
                    .unwrap_or(&empty);
                WideTable::from_series(region.column(), series)
            })
            .reduce(|acc, t| acc.join(&t, JoinMode::Outer))
            .unwrap_or_default();

        tracing::info!(months = table.len(), "Built regional alert union");
        table
    }

    /// Inner-join the alert union with statewide AQI
    ///
    /// An empty result is returned as an empty table and logged; it is never
    /// padded with placeholder rows.
    pub fn merge_with_aqi(&self, alerts: &WideTable, aqi: &MonthlySeries) -> PipelineResult<MergedTable> {
        let joined = alerts.join(&WideTable::from_series(AQI_COLUMN, aqi), JoinMode::Inner);
        let merged = MergedTable::from_wide(&joined)?;

        if merged.is_empty() {
            tracing::warn!(
                alert_months = alerts.len(),
                aqi_months = aqi.len(),
                "AQI merge produced no rows"
            );
        } else {
            tracing::info!(months = merged.len(), "Merged alerts with AQI");
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(y: i32, m: u32) -> MonthStart {
        MonthStart::from_ym(y, m).unwrap()
    }

    fn series(values: &[(MonthStart, f64)]) -> MonthlySeries {
        values.iter().copied().collect()
    }

    fn regional(region: Region, values: &[(MonthStart, f64)]) -> RegionalMonthly {
        RegionalMonthly {
            region,
            series: series(values),
        }
    }

    #[test]
    fn test_outer_join_scenario() {
        let a = WideTable::from_series("A", &series(&[(month(2020, 1), 1.0), (month(2020, 2), 2.0)]));
        let b = WideTable::from_series("B", &series(&[(month(2020, 2), 20.0), (month(2020, 3), 30.0)]));

        let joined = a.join(&b, JoinMode::Outer);
        let dates: Vec<_> = joined.dates().collect();
        assert_eq!(dates, vec![month(2020, 1), month(2020, 2), month(2020, 3)]);
        assert_eq!(joined.value(month(2020, 3), "A"), None);
        assert_eq!(joined.value(month(2020, 1), "B"), None);
        assert_eq!(joined.value(month(2020, 2), "B"), Some(20.0));
    }

    #[test]
    fn test_inner_join_keeps_intersection() {
        let a = WideTable::from_series("A", &series(&[(month(2020, 1), 1.0), (month(2020, 2), 2.0)]));
        let b = WideTable::from_series("B", &series(&[(month(2020, 2), 20.0), (month(2020, 3), 30.0)]));

        let joined = a.join(&b, JoinMode::Inner);
        assert_eq!(joined.dates().collect::<Vec<_>>(), vec![month(2020, 2)]);
        assert_eq!(joined.columns(), ["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_union_regions_is_union_of_dates() {
        let merger = SeriesMerger;
        let union = merger.union_regions(&[
            regional(Region::Ontario, &[(month(2020, 1), 4.0)]),
            regional(Region::Quebec, &[(month(2020, 2), 0.0), (month(2020, 3), 7.0)]),
            regional(Region::NewfoundlandAndLabrador, &[(month(2020, 3), 1.0)]),
        ]);

        assert_eq!(union.len(), 3);
        assert_eq!(union.columns(), ["Ontario_VIF", "Quebec_VIF", "NL_VIF"]);
        for (_, row) in union.rows() {
            assert_eq!(row.len(), 3);
            assert!(row.iter().any(|v| v.is_some()));
        }
        // a reported zero stays a zero, a missing month stays null
        assert_eq!(union.value(month(2020, 2), "Quebec_VIF"), Some(0.0));
        assert_eq!(union.value(month(2020, 2), "Ontario_VIF"), None);
    }

    #[test]
    fn test_union_with_missing_region_has_null_column() {
        let union = SeriesMerger.union_regions(&[regional(Region::Quebec, &[(month(2020, 5), 3.0)])]);
        assert_eq!(union.columns().len(), 3);
        assert_eq!(union.value(month(2020, 5), "Ontario_VIF"), None);
        assert_eq!(union.value(month(2020, 5), "Quebec_VIF"), Some(3.0));
    }

    #[test]
    fn test_aqi_merge_scenario() {
        // alerts cover 2019-12..2020-06, AQI covers 2020-01..2020-12
        let alert_months: Vec<_> = month(2019, 12).through(month(2020, 6)).map(|m| (m, 1.0)).collect();
        let aqi: MonthlySeries = month(2020, 1).through(month(2020, 12)).map(|m| (m, 40.0)).collect();

        let union = SeriesMerger.union_regions(&[regional(Region::Ontario, &alert_months)]);
        let merged = SeriesMerger.merge_with_aqi(&union, &aqi).unwrap();

        let dates: Vec<_> = merged.rows().iter().map(|r| r.date).collect();
        let expected: Vec<_> = month(2020, 1).through(month(2020, 6)).collect();
        assert_eq!(dates, expected);
        assert!(merged.rows().iter().all(|r| aqi.contains(r.date)));
        assert_eq!(merged.rows()[0].alert(Region::Quebec), None);
    }

    #[test]
    fn test_empty_aqi_gives_empty_table() {
        let union = SeriesMerger.union_regions(&[regional(Region::Ontario, &[(month(2020, 1), 2.0)])]);
        let merged = SeriesMerger.merge_with_aqi(&union, &MonthlySeries::new()).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_from_wide_rejects_null_aqi() {
        let union = SeriesMerger.union_regions(&[regional(Region::Ontario, &[(month(2020, 1), 2.0)])]);
        let aqi = WideTable::from_series(AQI_COLUMN, &series(&[(month(2020, 2), 30.0)]));
        let outer = union.join(&aqi, JoinMode::Outer);

        let err = MergedTable::from_wide(&outer).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTable { .. }));
    }

    #[test]
    fn test_from_rows_checks_width() {
        let mut rows = BTreeMap::new();
        rows.insert(month(2020, 1), vec![Some(1.0)]);
        assert!(WideTable::from_rows(vec!["A".into(), "B".into()], rows).is_err());
    }

    #[test]
    fn test_for_year() {
        let table = MergedTable::from_rows(vec![
            MergedRow::new(month(2020, 12), [Some(1.0), None, None], 30.0),
            MergedRow::new(month(2021, 1), [None, Some(2.0), None], 35.0),
        ]);
        let year = table.for_year(2021);
        assert_eq!(year.len(), 1);
        assert_eq!(year.rows()[0].alert(Region::Quebec), Some(2.0));
    }
}
