//! Regional alert export reader
//!
//! Reads `{year, week, count}` rows for one region. Year filtering and date
//! construction belong to the normalizer; this layer only turns text into
//! typed `RawAlertRecord`s.

use super::{field_error, parse_integer, read_single_member, resolve_columns, MAX_RETAINED_ERRORS};
use crate::config::AlertSchema;
use crate::series::{PipelineResult, RawAlertRecord, RecordError, Region};
use std::io::Read;
use std::path::Path;

/// Reader for regional alert CSVs with configurable column names
#[derive(Debug, Clone, Default)]
pub struct AlertReader {
    schema: AlertSchema,
}

/// Result of reading one regional export
#[derive(Debug)]
pub struct AlertBatch {
    pub region: Region,
    pub records: Vec<RawAlertRecord>,
    pub rows_read: usize,
    pub rows_failed: usize,
    pub errors: Vec<RecordError>,
}

impl AlertReader {
    pub fn new(schema: AlertSchema) -> Self {
        Self { schema }
    }

    /// Read the single CSV inside a regional zip archive
    pub fn read_archive(&self, region: Region, archive: &Path) -> PipelineResult<AlertBatch> {
        let (member, data) = read_single_member(archive)?;
        let source_name = format!("{} ({})", archive.display(), member);
        self.read_from(region, data.as_slice(), &source_name)
    }

    /// Read an uncompressed CSV file
    pub fn read_path(&self, region: Region, path: &Path) -> PipelineResult<AlertBatch> {
        let file = std::fs::File::open(path).map_err(|e| crate::series::PipelineError::io(path, e))?;
        self.read_from(region, file, &path.display().to_string())
    }

    /// Read alert rows from any reader
    ///
    /// `source_name` is used in error messages only.
    pub fn read_from<R: Read>(
        &self,
        region: Region,
        reader: R,
        source_name: &str,
    ) -> PipelineResult<AlertBatch> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let [year_idx, week_idx, count_idx] = resolve_columns(
            &headers,
            [
                self.schema.year.as_str(),
                self.schema.week.as_str(),
                self.schema.count.as_str(),
            ],
            source_name,
        )?;

        let mut records = Vec::new();
        let mut rows_read = 0;
        let mut rows_failed = 0;
        let mut errors = Vec::new();

        for (line_num, result) in reader.records().enumerate() {
            // header is line 1
            let line = line_num + 2;
            rows_read += 1;

            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(%region, line, error = %e, "Skipping unreadable alert row");
                    rows_failed += 1;
                    continue;
                }
            };

            match parse_row(region, &row, line, [year_idx, week_idx, count_idx]) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(%region, source = source_name, "Dropping alert record: {}", e);
                    rows_failed += 1;
                    if errors.len() < MAX_RETAINED_ERRORS {
                        errors.push(e);
                    }
                }
            }
        }

        tracing::info!(
            %region,
            source = source_name,
            rows = rows_read,
            failed = rows_failed,
            "Read alert export"
        );

        Ok(AlertBatch {
            region,
            records,
            rows_read,
            rows_failed,
            errors,
        })
    }
}

fn parse_row(
    region: Region,
    row: &csv::StringRecord,
    line: usize,
    [year_idx, week_idx, count_idx]: [usize; 3],
) -> Result<RawAlertRecord, RecordError> {
    let year_str = row.get(year_idx).unwrap_or("");
    let week_str = row.get(week_idx).unwrap_or("");
    let count_str = row.get(count_idx).unwrap_or("");

    let year = parse_integer(year_str)
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| field_error(line, "year", year_str))?;
    let iso_week = parse_integer(week_str)
        .and_then(|w| u32::try_from(w).ok())
        .ok_or_else(|| field_error(line, "week", week_str))?;
    let count = parse_integer(count_str).ok_or_else(|| field_error(line, "count", count_str))?;
    let count = u64::try_from(count).map_err(|_| RecordError::NegativeCount {
        line,
        value: count_str.to_string(),
    })?;

    Ok(RawAlertRecord {
        region,
        year,
        iso_week,
        count,
    })
}
