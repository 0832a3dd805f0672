//! Pipeline error types
//!
//! Two tiers: `PipelineError` aborts the run (missing columns, unreadable
//! archives, I/O), `RecordError` describes one bad input row and is only ever
//! logged and counted.

use super::types::Region;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An expected column is not present in a source table
    #[error("Missing column '{column}' in {source_name}")]
    MissingColumn { source_name: String, column: String },

    /// Archive has no readable member or more than one
    #[error("Archive {archive:?}: {reason}")]
    Archive { archive: PathBuf, reason: String },

    /// Archive could not be opened or decoded
    #[error("Archive {archive:?}: {source}")]
    Zip {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// File could not be opened, read or written
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV framing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Derived table is malformed (cannot happen for files this crate wrote)
    #[error("Invalid table {source_name}: {reason}")]
    InvalidTable { source_name: String, reason: String },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// JSON export failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing_column(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        PipelineError::MissingColumn {
            source_name: source_name.into(),
            column: column.into(),
        }
    }

    /// Configuration faults: the inputs do not match what the run was set up for
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingColumn { .. }
                | PipelineError::Archive { .. }
                | PipelineError::Config(_)
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A single input row that was dropped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// (year, week) does not name an ISO week
    #[error("{region}: year {year} week {week} is not a valid ISO week")]
    InvalidIsoWeek { region: Region, year: i32, week: u32 },

    /// A field could not be parsed as the expected type
    #[error("line {line}: cannot parse {field} from '{value}'")]
    InvalidField {
        line: usize,
        field: String,
        value: String,
    },

    /// Alert count below zero
    #[error("line {line}: negative count {value}")]
    NegativeCount { line: usize, value: String },
}
