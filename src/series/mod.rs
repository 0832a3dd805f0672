//! Series types shared by every stage
//!
//! - **types**: regions, raw records, weekly/daily/monthly series
//! - **period**: ISO-week and month-start date arithmetic
//! - **error**: pipeline and record-level error types
//!
//! # Data flow
//!
//! ```text
//! RawAlertRecord → WeeklySeries ┐
//!                               ├→ MonthlySeries → merge → correlate
//! daily AQI rows → DailySeries ─┘
//! ```

pub mod error;
pub mod period;
pub mod types;

pub use error::{PipelineError, PipelineResult, RecordError};
pub use period::{iso_week_monday, MonthStart, YearRange};
pub use types::{
    Aggregation, DailySeries, MonthlySeries, Observations, RawAlertRecord, Region,
    RegionalMonthly, WeeklySeries,
};
