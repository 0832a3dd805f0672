//! Flat table snapshots
//!
//! CSV writers for every derived table, and readers for the ones later stages
//! consume, so each stage can run on its own from files:
//!
//! | table       | columns                                          |
//! |-------------|--------------------------------------------------|
//! | regional    | `date, VIF_count, Region`                        |
//! | statewide   | `date, NY_AQI`                                   |
//! | county      | `date, County, County_AQI`                       |
//! | merged      | `date, Ontario_VIF, Quebec_VIF, NL_VIF, NY_AQI`  |
//! | correlation | `region, lag_0 .. lag_N`                         |
//!
//! Nulls are written as empty cells; undefined coefficients as `undefined`.

use crate::correlation::{lag_label, CorrelationTable};
use crate::county::CountyAqiSeries;
use crate::ingest::resolve_columns;
use crate::merge::{MergedTable, WideTable, AQI_COLUMN};
use crate::series::{MonthStart, MonthlySeries, PipelineError, PipelineResult, Region, RegionalMonthly};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Marker written for a coefficient that could not be computed
pub const UNDEFINED: &str = "undefined";

fn create_writer(path: &Path) -> PipelineResult<csv::Writer<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

fn finish(mut writer: csv::Writer<File>, path: &Path, rows: usize) -> PipelineResult<()> {
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    tracing::info!(path = ?path, rows, "Wrote table");
    Ok(())
}

fn open_reader(path: &Path) -> PipelineResult<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn invalid(path: &Path, reason: String) -> PipelineError {
    PipelineError::InvalidTable {
        source_name: path.display().to_string(),
        reason,
    }
}

fn parse_month(path: &Path, line: usize, s: &str) -> PipelineResult<MonthStart> {
    MonthStart::parse(s).ok_or_else(|| invalid(path, format!("line {}: bad month '{}'", line, s)))
}

fn parse_cell(path: &Path, line: usize, s: &str) -> PipelineResult<Option<f64>> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse::<f64>()
        .map(Some)
        .map_err(|_| invalid(path, format!("line {}: bad number '{}'", line, s)))
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write `{date, VIF_count, Region}`
pub fn write_regional(path: &Path, monthly: &RegionalMonthly) -> PipelineResult<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["date", "VIF_count", "Region"])?;
    for (month, count) in monthly.series.iter() {
        writer.write_record([month.to_string(), count.to_string(), monthly.region.label().to_string()])?;
    }
    finish(writer, path, monthly.series.len())
}

/// Read a regional monthly table written by `write_regional`
pub fn read_regional(path: &Path, region: Region) -> PipelineResult<RegionalMonthly> {
    let mut reader = open_reader(path)?;
    let source = path.display().to_string();
    let [date_idx, count_idx] = resolve_columns(reader.headers()?, ["date", "VIF_count"], &source)?;

    let mut series = MonthlySeries::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let month = parse_month(path, line, row.get(date_idx).unwrap_or(""))?;
        if let Some(count) = parse_cell(path, line, row.get(count_idx).unwrap_or(""))? {
            series.insert(month, count);
        }
    }
    Ok(RegionalMonthly { region, series })
}

/// Write `{date, NY_AQI}`
pub fn write_statewide(path: &Path, aqi: &MonthlySeries) -> PipelineResult<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["date", AQI_COLUMN])?;
    for (month, value) in aqi.iter() {
        writer.write_record([month.to_string(), value.to_string()])?;
    }
    finish(writer, path, aqi.len())
}

pub fn read_statewide(path: &Path) -> PipelineResult<MonthlySeries> {
    let mut reader = open_reader(path)?;
    let source = path.display().to_string();
    let [date_idx, aqi_idx] = resolve_columns(reader.headers()?, ["date", AQI_COLUMN], &source)?;

    let mut series = MonthlySeries::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let month = parse_month(path, line, row.get(date_idx).unwrap_or(""))?;
        if let Some(value) = parse_cell(path, line, row.get(aqi_idx).unwrap_or(""))? {
            series.insert(month, value);
        }
    }
    Ok(series)
}

/// Write `{date, County, County_AQI}` sorted by county then date
pub fn write_county(path: &Path, counties: &CountyAqiSeries) -> PipelineResult<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["date", "County", "County_AQI"])?;
    for (county, month, value) in counties.iter() {
        writer.write_record([month.to_string(), county.to_string(), value.to_string()])?;
    }
    finish(writer, path, counties.len())
}

pub fn read_county(path: &Path) -> PipelineResult<CountyAqiSeries> {
    let mut reader = open_reader(path)?;
    let source = path.display().to_string();
    let [date_idx, county_idx, aqi_idx] =
        resolve_columns(reader.headers()?, ["date", "County", "County_AQI"], &source)?;

    let mut counties = CountyAqiSeries::default();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let month = parse_month(path, line, row.get(date_idx).unwrap_or(""))?;
        if let Some(value) = parse_cell(path, line, row.get(aqi_idx).unwrap_or(""))? {
            counties.insert(row.get(county_idx).unwrap_or(""), month, value);
        }
    }
    Ok(counties)
}

/// Write `{date, Ontario_VIF, Quebec_VIF, NL_VIF, NY_AQI}`
///
/// An empty table still gets its header row.
pub fn write_merged(path: &Path, merged: &MergedTable) -> PipelineResult<()> {
    let mut writer = create_writer(path)?;
    let mut header = vec!["date"];
    header.extend(Region::all().iter().map(|r| r.column()));
    header.push(AQI_COLUMN);
    writer.write_record(&header)?;

    for row in merged.rows() {
        let mut record = vec![row.date.to_string()];
        record.extend(Region::all().iter().map(|r| format_cell(row.alert(*r))));
        record.push(row.aqi.to_string());
        writer.write_record(&record)?;
    }
    finish(writer, path, merged.len())
}

pub fn read_merged(path: &Path) -> PipelineResult<MergedTable> {
    let mut reader = open_reader(path)?;
    let source = path.display().to_string();
    let [date_idx, on_idx, qc_idx, nl_idx, aqi_idx] = resolve_columns(
        reader.headers()?,
        [
            "date",
            Region::Ontario.column(),
            Region::Quebec.column(),
            Region::NewfoundlandAndLabrador.column(),
            AQI_COLUMN,
        ],
        &source,
    )?;

    let mut rows = BTreeMap::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let month = parse_month(path, line, row.get(date_idx).unwrap_or(""))?;
        let values = [on_idx, qc_idx, nl_idx, aqi_idx]
            .iter()
            .map(|idx| parse_cell(path, line, row.get(*idx).unwrap_or("")))
            .collect::<PipelineResult<Vec<_>>>()?;
        rows.insert(month, values);
    }

    let columns = Region::all()
        .iter()
        .map(|r| r.column().to_string())
        .chain(std::iter::once(AQI_COLUMN.to_string()))
        .collect();
    let table = WideTable::from_rows(columns, rows)?;
    MergedTable::from_wide(&table).map_err(|e| invalid(path, e.to_string()))
}

/// Write `{region, lag_0 .. lag_N}`, one row per region
pub fn write_correlations(path: &Path, table: &CorrelationTable) -> PipelineResult<()> {
    let mut writer = create_writer(path)?;
    let mut header = vec!["region".to_string()];
    header.extend(table.lags().map(lag_label));
    writer.write_record(&header)?;

    for region in Region::all() {
        let mut record = vec![region.column().to_string()];
        record.extend(table.lags().map(|lag| {
            table
                .get(lag, *region)
                .and_then(|c| c.coefficient.value())
                .map(|r| r.to_string())
                .unwrap_or_else(|| UNDEFINED.to_string())
        }));
        writer.write_record(&record)?;
    }
    finish(writer, path, Region::all().len())
}

/// Console rendering of the correlation table, rounded to 3 decimals
pub fn render_correlations(table: &CorrelationTable) -> String {
    let mut out = String::new();
    out.push_str("=== Correlation of VIF Alerts vs New York AQI ===\n\n");
    out.push_str("Positive value = higher VIF associated with higher AQI\n");
    out.push_str("Negative value = higher VIF associated with lower AQI\n\n");

    out.push_str(&format!("{:<12}", ""));
    for lag in table.lags() {
        out.push_str(&format!(" {:>10}", lag_label(lag)));
    }
    out.push('\n');
    out.push_str(&"-".repeat(12 + (table.max_lag() + 1) * 11));
    out.push('\n');

    for region in Region::all() {
        out.push_str(&format!("{:<12}", region.column()));
        for lag in table.lags() {
            let cell = table
                .get(lag, *region)
                .and_then(|c| c.coefficient.value())
                .map(|r| format!("{:.3}", r))
                .unwrap_or_else(|| UNDEFINED.to_string());
            out.push_str(&format!(" {:>10}", cell));
        }
        out.push('\n');
    }
    out
}

/// JSON array of every correlation cell
pub fn correlations_json(table: &CorrelationTable) -> PipelineResult<String> {
    Ok(serde_json::to_string_pretty(&table.entries())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::LagCorrelationEngine;
    use crate::merge::MergedRow;

    fn month(y: i32, m: u32) -> MonthStart {
        MonthStart::from_ym(y, m).unwrap()
    }

    fn merged() -> MergedTable {
        MergedTable::from_rows(vec![
            MergedRow::new(month(2020, 1), [Some(8.0), None, Some(1.0)], 41.5),
            MergedRow::new(month(2020, 2), [Some(10.0), Some(2.0), None], 38.0),
            MergedRow::new(month(2020, 3), [Some(3.0), Some(0.0), Some(4.0)], 45.25),
        ])
    }

    #[test]
    fn test_merged_file_keeps_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("merged.csv");
        write_merged(&path, &merged()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,Ontario_VIF,Quebec_VIF,NL_VIF,NY_AQI"));
        assert_eq!(lines.next(), Some("2020-01-01,8,,1,41.5"));

        assert_eq!(read_merged(&path).unwrap(), merged());
    }

    #[test]
    fn test_empty_merged_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        write_merged(&path, &MergedTable::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(read_merged(&path).unwrap().is_empty());
    }

    #[test]
    fn test_merged_with_null_aqi_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        std::fs::write(&path, "date,Ontario_VIF,Quebec_VIF,NL_VIF,NY_AQI\n2020-01-01,1,2,3,\n").unwrap();

        assert!(matches!(read_merged(&path), Err(PipelineError::InvalidTable { .. })));
    }

    #[test]
    fn test_regional_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monthly_nl.csv");
        let monthly = RegionalMonthly {
            region: Region::NewfoundlandAndLabrador,
            series: vec![(month(2020, 1), 8.0), (month(2020, 2), 10.0)].into_iter().collect(),
        };
        write_regional(&path, &monthly).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("2020-02-01,10,Newfoundland and Labrador"));
        assert_eq!(read_regional(&path, Region::NewfoundlandAndLabrador).unwrap(), monthly);
    }

    #[test]
    fn test_statewide_and_county_files() {
        let dir = tempfile::tempdir().unwrap();

        let statewide: MonthlySeries = vec![(month(2020, 1), 42.25)].into_iter().collect();
        let path = dir.path().join("monthly_statewide.csv");
        write_statewide(&path, &statewide).unwrap();
        assert_eq!(read_statewide(&path).unwrap(), statewide);

        let mut counties = CountyAqiSeries::default();
        counties.insert("Albany", month(2020, 1), 40.0);
        counties.insert("Kings", month(2020, 1), 55.5);
        let path = dir.path().join("county.csv");
        write_county(&path, &counties).unwrap();
        assert_eq!(read_county(&path).unwrap(), counties);
    }

    #[test]
    fn test_correlation_outputs_mark_undefined() {
        let table = LagCorrelationEngine::new(2).compute(&merged());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corr.csv");
        write_correlations(&path, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "region,lag_0,lag_1,lag_2");
        // lag 2 leaves a single pair
        assert!(lines[1].ends_with(",undefined"));

        let rendered = render_correlations(&table);
        assert!(rendered.contains("Ontario_VIF"));
        assert!(rendered.contains("undefined"));

        let json = correlations_json(&table).unwrap();
        assert!(json.contains("\"lag\": \"lag_0\""));
    }

    #[test]
    fn test_missing_file() {
        let err = read_statewide(Path::new("/nonexistent/monthly_statewide.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
