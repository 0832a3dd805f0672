//! Daily county AQI reader
//!
//! Reads `{date, county, AQI, state}` rows, keeping only the target state and
//! the configured year window.

use super::{field_error, resolve_columns, MAX_RETAINED_ERRORS};
use crate::config::AqiSchema;
use crate::series::{DailySeries, PipelineError, PipelineResult, RecordError, YearRange};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// One daily county reading
#[derive(Debug, Clone, PartialEq)]
pub struct AqiRecord {
    pub date: NaiveDate,
    pub county: String,
    pub aqi: f64,
}

/// Reader for the daily AQI table
#[derive(Debug, Clone)]
pub struct AqiReader {
    schema: AqiSchema,
    state: String,
    years: YearRange,
}

/// Result of reading the daily AQI table
#[derive(Debug, Default)]
pub struct AqiBatch {
    pub records: Vec<AqiRecord>,
    pub rows_read: usize,
    pub rows_failed: usize,
    /// Rows outside the target state or year window
    pub rows_filtered: usize,
    pub errors: Vec<RecordError>,
}

impl AqiBatch {
    /// Every reading in one series, for the statewide monthly mean
    pub fn statewide(&self) -> DailySeries {
        self.records.iter().map(|r| (r.date, r.aqi)).collect()
    }

    /// Readings grouped by county name
    pub fn by_county(&self) -> BTreeMap<String, DailySeries> {
        let mut grouped: BTreeMap<String, DailySeries> = BTreeMap::new();
        for record in &self.records {
            grouped
                .entry(record.county.clone())
                .or_default()
                .push(record.date, record.aqi);
        }
        grouped
    }
}

impl AqiReader {
    pub fn new(schema: AqiSchema, state: impl Into<String>, years: YearRange) -> Self {
        Self {
            schema,
            state: state.into(),
            years,
        }
    }

    pub fn read_path(&self, path: &Path) -> PipelineResult<AqiBatch> {
        let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
        self.read_from(file, &path.display().to_string())
    }

    pub fn read_from<R: Read>(&self, reader: R, source_name: &str) -> PipelineResult<AqiBatch> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let [date_idx, county_idx, aqi_idx, state_idx] = resolve_columns(
            &headers,
            [
                self.schema.date.as_str(),
                self.schema.county.as_str(),
                self.schema.aqi.as_str(),
                self.schema.state.as_str(),
            ],
            source_name,
        )?;

        let mut batch = AqiBatch::default();

        for (line_num, result) in reader.records().enumerate() {
            let line = line_num + 2;
            batch.rows_read += 1;

            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(line, error = %e, "Skipping unreadable AQI row");
                    batch.rows_failed += 1;
                    continue;
                }
            };

            if row.get(state_idx).unwrap_or("") != self.state {
                batch.rows_filtered += 1;
                continue;
            }

            let date_str = row.get(date_idx).unwrap_or("");
            let aqi_str = row.get(aqi_idx).unwrap_or("");
            let parsed = parse_date(date_str)
                .ok_or_else(|| field_error(line, "date", date_str))
                .and_then(|date| {
                    aqi_str
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .map(|aqi| (date, aqi))
                        .ok_or_else(|| field_error(line, "AQI", aqi_str))
                });

            match parsed {
                Ok((date, _)) if !self.years.contains_date(date) => {
                    batch.rows_filtered += 1;
                }
                Ok((date, aqi)) => batch.records.push(AqiRecord {
                    date,
                    county: row.get(county_idx).unwrap_or("").to_string(),
                    aqi,
                }),
                Err(e) => {
                    tracing::warn!(source = source_name, "Dropping AQI record: {}", e);
                    batch.rows_failed += 1;
                    if batch.errors.len() < MAX_RETAINED_ERRORS {
                        batch.errors.push(e);
                    }
                }
            }
        }

        tracing::info!(
            source = source_name,
            state = %self.state,
            rows = batch.rows_read,
            kept = batch.records.len(),
            filtered = batch.rows_filtered,
            failed = batch.rows_failed,
            "Read daily AQI table"
        );

        Ok(batch)
    }
}

/// Parse a date in the formats AQI exports are known to use
fn parse_date(s: &str) -> Option<NaiveDate> {
    let formats = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            // timestamps such as 2020-01-15 00:00:00
            s.split_whitespace()
                .next()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        })
}
