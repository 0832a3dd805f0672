//! Wildfire AQI CLI
//!
//! Command-line interface for running single pipeline stages:
//! - Normalize one region's alert archive to monthly counts
//! - Resample the daily AQI table to statewide and county means
//! - Merge regional tables with statewide AQI
//! - Correlate a merged table at forward lags
//! - Run everything, or print a config template

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wildfire_aqi::config::generate_default_config;
use wildfire_aqi::{tables, top_counties, Config, LoggingConfig, Pipeline, Region};

#[derive(Parser)]
#[command(name = "wildfire-aqi-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Align wildfire alerts with New York AQI and correlate them")]
#[command(long_about = "Stage-by-stage access to the wildfire alert / AQI pipeline.\nEach stage reads and writes flat CSV tables, so stages can be rerun independently.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize a regional alert archive to monthly counts
    Normalize {
        /// Region (ontario/on, quebec/qc, nl)
        #[arg(value_parser = parse_region)]
        region: Region,
        /// Zip archive (default: from config)
        #[arg(short, long)]
        archive: Option<PathBuf>,
        /// Output file (default: monthly_<code>.csv in the output dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resample daily AQI to statewide and county monthly means
    Aqi {
        /// Daily AQI CSV (default: from config)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Summarize this year: worst counties and Upstate/Downstate averages
        #[arg(long)]
        year: Option<i32>,
    },

    /// Merge the regional tables with statewide AQI
    Merge {
        /// Output file (default: merged table in the output dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Correlate alerts with AQI at lags 0..=max-lag
    Correlate {
        /// Merged table (default: merged table in the output dir)
        #[arg(short, long)]
        merged: Option<PathBuf>,
        /// Highest forward lag in months
        #[arg(long)]
        max_lag: Option<usize>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Also write the correlation CSV here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every stage and write all tables
    Run,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Normalize {
            region,
            archive,
            output,
        } => {
            let archive = match archive.or_else(|| config.sources.archive(region).map(Path::to_path_buf)) {
                Some(path) => path,
                None => bail!("no archive given and sources.{} is not set", region),
            };
            let output = output.unwrap_or_else(|| config.output.regional_path(region));

            let pipeline = Pipeline::new(config)?;
            let (monthly, report) = pipeline.process_region(region, &archive)?;
            tables::write_regional(&output, &monthly)?;

            println!("{} ({})", region.label(), archive.display());
            println!("  Rows read: {}", report.rows_read);
            println!("  Rows failed: {}", report.rows_failed);
            println!("  Out of range: {}", report.out_of_range);
            println!("  Invalid weeks: {}", report.invalid_weeks);
            println!("  Weeks: {}", report.weeks);
            println!("  Months: {}", report.months);
            println!("Written to {:?}", output);
        }

        Commands::Aqi { input, year } => {
            let input = match input.or_else(|| config.sources.daily_aqi.clone()) {
                Some(path) => path,
                None => bail!("no input given and sources.daily_aqi is not set"),
            };
            let statewide_path = config.output.statewide_path();
            let county_path = config.output.county_path();
            let top_n = config.county.top_n;
            let downstate = config.county.downstate.clone();

            let pipeline = Pipeline::new(config)?;
            let aqi = pipeline.process_aqi(&input)?;
            tables::write_statewide(&statewide_path, &aqi.statewide)?;
            tables::write_county(&county_path, &aqi.counties)?;

            println!("AQI results:");
            println!("  Rows read: {}", aqi.rows_read);
            println!("  Rows kept: {}", aqi.rows_kept);
            println!("  Rows failed: {}", aqi.rows_failed);
            println!("  Statewide months: {}", aqi.statewide.len());
            println!("  Counties: {}", aqi.counties.counties().count());

            if let Some(year) = year {
                let means = aqi.counties.period_means(year, None);
                println!();
                println!("Worst counties in {}:", year);
                for (county, mean) in top_counties(&means, top_n) {
                    println!("  {:<20} {:.1}", county, mean);
                }

                println!();
                println!("{:<12} | {:<10} | {:<10}", "Month", "Downstate", "Upstate");
                println!("{}", "-".repeat(38));
                let fmt = |v: Option<f64>| v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string());
                for (month, avg) in aqi.counties.regional_averages(&downstate) {
                    if month.year() == year {
                        println!("{:<12} | {:<10} | {:<10}", month.to_string(), fmt(avg.downstate), fmt(avg.upstate));
                    }
                }
            }
        }

        Commands::Merge { output } => {
            let output = output.unwrap_or_else(|| config.output.merged_path());
            let mut regional = Vec::with_capacity(Region::all().len());
            for region in Region::all() {
                regional.push(tables::read_regional(&config.output.regional_path(*region), *region)?);
            }
            let statewide = tables::read_statewide(&config.output.statewide_path())?;

            let pipeline = Pipeline::new(config)?;
            let (union, merged) = pipeline.merge(&regional, &statewide)?;
            tables::write_merged(&output, &merged)?;

            println!("Union months: {}", union.len());
            println!("Merged months: {}", merged.len());
            if merged.is_empty() {
                eprintln!("Warning: no month has both alert and AQI data");
            }
            println!("Written to {:?}", output);
        }

        Commands::Correlate {
            merged,
            max_lag,
            format,
            output,
        } => {
            let mut config = config;
            if let Some(lag) = max_lag {
                config.pipeline.max_lag = lag;
            }
            let merged_path = merged.unwrap_or_else(|| config.output.merged_path());
            let merged = tables::read_merged(&merged_path)?;

            let pipeline = Pipeline::new(config)?;
            let correlations = pipeline.correlate(&merged);
            if let Some(path) = &output {
                tables::write_correlations(path, &correlations)?;
            }

            match format {
                OutputFormat::Table => print!("{}", tables::render_correlations(&correlations)),
                OutputFormat::Json => println!("{}", tables::correlations_json(&correlations)?),
                OutputFormat::Csv => print_csv(&correlations),
            }
        }

        Commands::Run => {
            let pipeline = Pipeline::new(config)?;
            let output = pipeline.run()?;
            pipeline.write_outputs(&output)?;

            println!("{}", serde_json::to_string_pretty(&output.report)?);
            println!();
            print!("{}", tables::render_correlations(&output.correlations));
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::load_default()),
    }
}

fn parse_region(s: &str) -> Result<Region, String> {
    Region::from_str(s).ok_or_else(|| format!("unknown region '{}' (expected ontario, quebec or nl)", s))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wildfire_aqi={}", logging.level).into());

    // stdout is reserved for command output
    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_csv(correlations: &wildfire_aqi::CorrelationTable) {
    print!("region");
    for lag in correlations.lags() {
        print!(",{}", wildfire_aqi::correlation::lag_label(lag));
    }
    println!();

    for region in Region::all() {
        print!("{}", region.column());
        for lag in correlations.lags() {
            let val = correlations
                .get(lag, *region)
                .and_then(|c| c.coefficient.value())
                .map(|r| format!("{:.3}", r))
                .unwrap_or_else(|| tables::UNDEFINED.to_string());
            print!(",{}", val);
        }
        println!();
    }
}
