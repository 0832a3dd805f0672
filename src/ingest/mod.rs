//! Source Ingestion
//!
//! Readers for the raw inputs:
//! - regional alert exports, each a zip archive holding one CSV
//! - the daily county-level AQI CSV
//!
//! Column names come from the configured schema. A missing column is a
//! fatal `PipelineError::MissingColumn`; a bad row is a `RecordError` that is
//! logged, counted and skipped.

mod alerts;
mod aqi;
pub(crate) mod archive;

pub use alerts::{AlertBatch, AlertReader};
pub use aqi::{AqiBatch, AqiReader, AqiRecord};
pub use archive::read_single_member;

use crate::series::{PipelineError, PipelineResult, RecordError};

/// Keep at most this many record errors per batch; the rest are only counted
const MAX_RETAINED_ERRORS: usize = 100;

/// Find each of `names` in a header row, ignoring surrounding whitespace
pub(crate) fn resolve_columns<const N: usize>(
    headers: &csv::StringRecord,
    names: [&str; N],
    source_name: &str,
) -> PipelineResult<[usize; N]> {
    let mut indices = [0usize; N];
    for (slot, name) in indices.iter_mut().zip(names) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == name.trim())
            .ok_or_else(|| PipelineError::missing_column(source_name, name))?;
    }
    Ok(indices)
}

/// Parse an integer, accepting integral float text such as `2020.0`
fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn field_error(line: usize, field: &str, value: &str) -> RecordError {
    RecordError::InvalidField {
        line,
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("2020"), Some(2020));
        assert_eq!(parse_integer(" 7 "), Some(7));
        assert_eq!(parse_integer("2020.0"), Some(2020));
        assert_eq!(parse_integer("-3"), Some(-3));
        assert_eq!(parse_integer("2.5"), None);
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("NaN"), None);
    }

    #[test]
    fn test_resolve_columns_trims_headers() {
        let headers = csv::StringRecord::from(vec![" alert__year", "alert__week ", "alert__count"]);
        let idx = resolve_columns(&headers, ["alert__count", "alert__year"], "test").unwrap();
        assert_eq!(idx, [2, 0]);
    }

    #[test]
    fn test_resolve_columns_missing_is_named() {
        let headers = csv::StringRecord::from(vec!["year", "week"]);
        let err = resolve_columns(&headers, ["year", "count"], "ontario.zip").unwrap_err();
        match err {
            PipelineError::MissingColumn { source_name, column } => {
                assert_eq!(source_name, "ontario.zip");
                assert_eq!(column, "count");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
