//! # Wildfire AQI
//!
//! Aligns weekly wildfire-alert counts from three Canadian regions with daily
//! New York air-quality readings on a common monthly grid, then measures how
//! alert activity relates to AQI at forward lags of 0 to N months.
//!
//! ## Modules
//!
//! - [`series`]: regions, weekly/daily/monthly series, month arithmetic, errors
//! - [`ingest`]: zip extraction and readers for the raw alert and AQI tables
//! - [`normalize`]: raw alert records to a dated weekly series
//! - [`resample`]: weekly or daily series to month-start buckets
//! - [`merge`]: outer union of regions, inner join with statewide AQI
//! - [`correlation`]: lagged Pearson coefficients
//! - [`county`]: county-level monthly AQI and its summaries
//! - [`tables`]: CSV snapshots of every derived table
//! - [`pipeline`]: one configured run of all stages
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wildfire_aqi::{Config, Pipeline};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(std::path::Path::new("wildfire-aqi.toml"))?;
//!     let pipeline = Pipeline::new(config)?;
//!
//!     let output = pipeline.run()?;
//!     pipeline.write_outputs(&output)?;
//!
//!     println!("{}", wildfire_aqi::tables::render_correlations(&output.correlations));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod correlation;
pub mod county;
pub mod ingest;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod resample;
pub mod series;
pub mod tables;

// Re-export top-level types for convenience
pub use series::{
    Aggregation, DailySeries, MonthStart, MonthlySeries, PipelineError, PipelineResult,
    RawAlertRecord, RecordError, Region, RegionalMonthly, WeeklySeries, YearRange,
};

pub use config::{Config, ConfigError, LoggingConfig};

pub use correlation::{
    Coefficient, CorrelationTable, LagCorrelation, LagCorrelationEngine, UndefinedReason,
};

pub use merge::{JoinMode, MergedRow, MergedTable, SeriesMerger, WideTable};

pub use normalize::{NormalizedRegion, RegionalNormalizer};

pub use resample::Resampler;

pub use county::{top_counties, CountyAqiSeries, RegionalAverage};

pub use pipeline::{Pipeline, RunOutput, RunReport};
