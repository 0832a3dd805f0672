//! Wildfire AQI pipeline
//!
//! Runs every stage from a config file and writes the derived tables.
//!
//! ```text
//! wildfire-aqi [config.toml]
//! ```
//!
//! Without an argument the config is taken from `WILDFIRE_AQI_CONFIG`, then
//! the default search locations.

use anyhow::Context;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wildfire_aqi::{tables, Config, LoggingConfig, Pipeline};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WILDFIRE_AQI_CONFIG").ok())
        .map(PathBuf::from);

    let config = match &config_path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);
    tracing::info!("Wildfire AQI pipeline v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Output directory: {:?}", config.output.dir);

    let pipeline = Pipeline::new(config).context("invalid configuration")?;
    let output = pipeline.run().context("pipeline run failed")?;
    pipeline
        .write_outputs(&output)
        .context("writing derived tables")?;

    for warning in &output.report.warnings {
        tracing::warn!("{}", warning);
    }
    println!("{}", tables::render_correlations(&output.correlations));

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wildfire_aqi={}", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
