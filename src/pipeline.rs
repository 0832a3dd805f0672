//! Pipeline orchestration
//!
//! A `Pipeline` is built fresh from a `Config` for every run. Each stage is a
//! plain function of its inputs, so stages can also be driven one at a time
//! from files (see the CLI).
//!
//! ```text
//! region zip ─→ AlertReader ─→ RegionalNormalizer ─→ Resampler(sum) ─┐
//!   (×3)                                                             ├→ union (outer)
//!                                                                    │      │
//! daily AQI ─→ AqiReader ─┬→ Resampler(mean) ─→ statewide ───────────┴→ merge (inner) ─→ correlate
//!                         └→ CountyAqiSeries
//! ```

use crate::config::{Config, ConfigError};
use crate::correlation::{CorrelationTable, LagCorrelationEngine};
use crate::county::CountyAqiSeries;
use crate::ingest::{AlertReader, AqiReader};
use crate::merge::{MergedTable, SeriesMerger, WideTable};
use crate::normalize::RegionalNormalizer;
use crate::resample::Resampler;
use crate::series::{MonthlySeries, PipelineResult, Region, RegionalMonthly, YearRange};
use crate::tables;
use serde::Serialize;
use std::path::Path;

/// Counts for one region's normalization
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegionReport {
    pub region: Option<Region>,
    pub rows_read: usize,
    pub rows_failed: usize,
    pub out_of_range: usize,
    pub invalid_weeks: usize,
    pub weeks: usize,
    pub months: usize,
}

/// Statewide and county AQI derived from one daily table
#[derive(Debug, Clone, Default)]
pub struct AqiOutput {
    pub statewide: MonthlySeries,
    pub counties: CountyAqiSeries,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_failed: usize,
}

/// Summary of a full run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub regions: Vec<RegionReport>,
    pub aqi_rows_read: usize,
    pub aqi_rows_kept: usize,
    pub aqi_rows_failed: usize,
    pub statewide_months: usize,
    pub union_months: usize,
    pub merged_rows: usize,
    pub undefined_correlations: usize,
    /// Recoverable conditions worth surfacing: empty joins, undefined coefficients
    pub warnings: Vec<String>,
}

/// Everything a full run produces
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub regional: Vec<RegionalMonthly>,
    pub aqi: AqiOutput,
    pub union: WideTable,
    pub merged: MergedTable,
    pub correlations: CorrelationTable,
    pub report: RunReport,
}

/// One configured run of the alignment pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    years: YearRange,
}

impl Pipeline {
    pub fn new(config: Config) -> PipelineResult<Self> {
        config.validate()?;
        let years = config.pipeline.year_range()?;
        Ok(Self { config, years })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read, normalize and resample one region's archive
    pub fn process_region(
        &self,
        region: Region,
        archive: &Path,
    ) -> PipelineResult<(RegionalMonthly, RegionReport)> {
        let reader = AlertReader::new(self.config.schema.alerts.clone());
        let batch = reader.read_archive(region, archive)?;

        let normalized = RegionalNormalizer::new(region, self.years).normalize(&batch.records);
        let monthly = Resampler::resample_weekly(&normalized.weekly);

        let report = RegionReport {
            region: Some(region),
            rows_read: batch.rows_read,
            rows_failed: batch.rows_failed,
            out_of_range: normalized.out_of_range,
            invalid_weeks: normalized.invalid_weeks,
            weeks: normalized.weekly.len(),
            months: monthly.series.len(),
        };
        Ok((monthly, report))
    }

    /// Statewide monthly mean and per-county monthly means
    pub fn process_aqi(&self, daily_path: &Path) -> PipelineResult<AqiOutput> {
        let reader = AqiReader::new(
            self.config.schema.aqi.clone(),
            self.config.pipeline.state.clone(),
            self.years,
        );
        let batch = reader.read_path(daily_path)?;

        let statewide = Resampler::mean().resample(&batch.statewide());
        let counties = CountyAqiSeries::from_daily(&batch.by_county());
        tracing::info!(
            months = statewide.len(),
            counties = counties.counties().count(),
            "Resampled AQI"
        );

        Ok(AqiOutput {
            statewide,
            counties,
            rows_read: batch.rows_read,
            rows_kept: batch.records.len(),
            rows_failed: batch.rows_failed,
        })
    }

    /// Regional union, then the AQI merge
    pub fn merge(
        &self,
        regional: &[RegionalMonthly],
        statewide: &MonthlySeries,
    ) -> PipelineResult<(WideTable, MergedTable)> {
        let merger = SeriesMerger;
        let union = merger.union_regions(regional);
        let merged = merger.merge_with_aqi(&union, statewide)?;
        Ok((union, merged))
    }

    pub fn correlate(&self, merged: &MergedTable) -> CorrelationTable {
        LagCorrelationEngine::new(self.config.pipeline.max_lag).compute(merged)
    }

    /// Run every stage from the configured sources
    pub fn run(&self) -> PipelineResult<RunOutput> {
        tracing::info!(years = %self.years, max_lag = self.config.pipeline.max_lag, "Starting pipeline run");

        let mut report = RunReport::default();
        let mut regional = Vec::with_capacity(Region::all().len());
        for region in Region::all() {
            let archive = self.config.sources.archive(*region).ok_or_else(|| {
                ConfigError::Invalid(format!("sources.{} is not set", region))
            })?;
            let (monthly, region_report) = self.process_region(*region, archive)?;
            if monthly.series.is_empty() {
                report
                    .warnings
                    .push(format!("{} produced no monthly alert data", region.label()));
            }
            regional.push(monthly);
            report.regions.push(region_report);
        }

        let daily_path = self
            .config
            .sources
            .daily_aqi
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("sources.daily_aqi is not set".to_string()))?;
        let aqi = self.process_aqi(daily_path)?;
        report.aqi_rows_read = aqi.rows_read;
        report.aqi_rows_kept = aqi.rows_kept;
        report.aqi_rows_failed = aqi.rows_failed;
        report.statewide_months = aqi.statewide.len();

        let (union, merged) = self.merge(&regional, &aqi.statewide)?;
        report.union_months = union.len();
        report.merged_rows = merged.len();
        if merged.is_empty() {
            report
                .warnings
                .push("merged table is empty: no month has both alert and AQI data".to_string());
        }

        let correlations = self.correlate(&merged);
        report.undefined_correlations = correlations.undefined_count();
        if report.undefined_correlations > 0 {
            report.warnings.push(format!(
                "{} correlation(s) undefined for lack of data",
                report.undefined_correlations
            ));
        }

        tracing::info!(
            merged_rows = report.merged_rows,
            undefined = report.undefined_correlations,
            warnings = report.warnings.len(),
            "Pipeline run complete"
        );

        Ok(RunOutput {
            regional,
            aqi,
            union,
            merged,
            correlations,
            report,
        })
    }

    /// Write every derived table under the configured output directory
    pub fn write_outputs(&self, output: &RunOutput) -> PipelineResult<()> {
        let out = &self.config.output;
        for monthly in &output.regional {
            tables::write_regional(&out.regional_path(monthly.region), monthly)?;
        }
        tables::write_statewide(&out.statewide_path(), &output.aqi.statewide)?;
        tables::write_county(&out.county_path(), &output.aqi.counties)?;
        tables::write_merged(&out.merged_path(), &output.merged)?;
        tables::write_correlations(&out.correlation_path(), &output.correlations)?;
        Ok(())
    }
}
