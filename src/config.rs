//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.
//!
//! A fresh `Config` is built for every run and threaded explicitly into the
//! pipeline; nothing is read from globals after startup.

use crate::series::{Region, YearRange};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub county: CountyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analysis window and correlation settings
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// Highest forward lag (in months) to correlate
    #[serde(default = "default_max_lag")]
    pub max_lag: usize,

    /// AQI rows from other states are discarded
    #[serde(default = "default_state")]
    pub state: String,
}

fn default_start_year() -> i32 {
    2010
}

fn default_end_year() -> i32 {
    2021
}

fn default_max_lag() -> usize {
    6
}

fn default_state() -> String {
    "New York".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            max_lag: default_max_lag(),
            state: default_state(),
        }
    }
}

impl PipelineConfig {
    pub fn year_range(&self) -> Result<YearRange, ConfigError> {
        YearRange::new(self.start_year, self.end_year).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            ))
        })
    }
}

/// Raw input locations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    pub ontario: Option<PathBuf>,
    pub quebec: Option<PathBuf>,
    pub newfoundland_and_labrador: Option<PathBuf>,

    /// Daily county-level AQI table
    pub daily_aqi: Option<PathBuf>,
}

impl SourcesConfig {
    /// Alert archive configured for `region`
    pub fn archive(&self, region: Region) -> Option<&Path> {
        match region {
            Region::Ontario => self.ontario.as_deref(),
            Region::Quebec => self.quebec.as_deref(),
            Region::NewfoundlandAndLabrador => self.newfoundland_and_labrador.as_deref(),
        }
    }
}

/// Column names expected in the raw sources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub alerts: AlertSchema,

    #[serde(default)]
    pub aqi: AqiSchema,
}

/// Columns of a regional alert export
#[derive(Debug, Clone, Deserialize)]
pub struct AlertSchema {
    #[serde(default = "default_year_column")]
    pub year: String,

    #[serde(default = "default_week_column")]
    pub week: String,

    #[serde(default = "default_count_column")]
    pub count: String,
}

fn default_year_column() -> String {
    "alert__year".to_string()
}

fn default_week_column() -> String {
    "alert__week".to_string()
}

fn default_count_column() -> String {
    "alert__count".to_string()
}

impl Default for AlertSchema {
    fn default() -> Self {
        Self {
            year: default_year_column(),
            week: default_week_column(),
            count: default_count_column(),
        }
    }
}

/// Columns of the daily county AQI table
#[derive(Debug, Clone, Deserialize)]
pub struct AqiSchema {
    #[serde(default = "default_date_column")]
    pub date: String,

    #[serde(default = "default_county_column")]
    pub county: String,

    #[serde(default = "default_aqi_column")]
    pub aqi: String,

    #[serde(default = "default_state_column")]
    pub state: String,
}

fn default_date_column() -> String {
    "Date".to_string()
}

fn default_county_column() -> String {
    "County Name".to_string()
}

fn default_aqi_column() -> String {
    "AQI".to_string()
}

fn default_state_column() -> String {
    "State Name".to_string()
}

impl Default for AqiSchema {
    fn default() -> Self {
        Self {
            date: default_date_column(),
            county: default_county_column(),
            aqi: default_aqi_column(),
            state: default_state_column(),
        }
    }
}

/// Where derived tables are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_statewide_file")]
    pub statewide_file: String,

    #[serde(default = "default_county_file")]
    pub county_file: String,

    #[serde(default = "default_merged_file")]
    pub merged_file: String,

    #[serde(default = "default_correlation_file")]
    pub correlation_file: String,
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_statewide_file() -> String {
    "monthly_statewide.csv".to_string()
}

fn default_county_file() -> String {
    "ny_monthly_county_aqi.csv".to_string()
}

fn default_merged_file() -> String {
    "merged_ny_vif.csv".to_string()
}

fn default_correlation_file() -> String {
    "vif_correlations.csv".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            statewide_file: default_statewide_file(),
            county_file: default_county_file(),
            merged_file: default_merged_file(),
            correlation_file: default_correlation_file(),
        }
    }
}

impl OutputConfig {
    pub fn path(&self, file: &str) -> PathBuf {
        Path::new(&self.dir).join(file)
    }

    /// `monthly_on.csv`, `monthly_qc.csv`, `monthly_nl.csv`
    pub fn regional_path(&self, region: Region) -> PathBuf {
        self.path(&format!("monthly_{}.csv", region.code()))
    }

    pub fn statewide_path(&self) -> PathBuf {
        self.path(&self.statewide_file)
    }

    pub fn county_path(&self) -> PathBuf {
        self.path(&self.county_file)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.path(&self.merged_file)
    }

    pub fn correlation_path(&self) -> PathBuf {
        self.path(&self.correlation_file)
    }
}

/// County-level AQI summaries
#[derive(Debug, Clone, Deserialize)]
pub struct CountyConfig {
    /// Counties averaged as "Downstate"; all others are "Upstate"
    #[serde(default = "default_downstate")]
    pub downstate: Vec<String>,

    /// How many of the worst counties to report
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_downstate() -> Vec<String> {
    [
        "New York",
        "Kings",
        "Queens",
        "Bronx",
        "Richmond",
        "Nassau",
        "Suffolk",
        "Westchester",
        "Rockland",
        "Putnam",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_top_n() -> usize {
    5
}

impl Default for CountyConfig {
    fn default() -> Self {
        Self {
            downstate: default_downstate(),
            top_n: default_top_n(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })?;

        tracing::debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("wildfire-aqi").join("config.toml")),
            Some(PathBuf::from("/etc/wildfire-aqi/config.toml")),
            Some(PathBuf::from("./wildfire-aqi.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.year_range()?;

        let columns = [
            ("schema.alerts.year", &self.schema.alerts.year),
            ("schema.alerts.week", &self.schema.alerts.week),
            ("schema.alerts.count", &self.schema.alerts.count),
            ("schema.aqi.date", &self.schema.aqi.date),
            ("schema.aqi.county", &self.schema.aqi.county),
            ("schema.aqi.aqi", &self.schema.aqi.aqi),
            ("schema.aqi.state", &self.schema.aqi.state),
        ];
        for (key, value) in columns {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("WILDFIRE_AQI_OUTPUT_DIR") {
            self.output.dir = dir;
        }
        if let Ok(lag) = std::env::var("WILDFIRE_AQI_MAX_LAG") {
            if let Ok(l) = lag.parse() {
                self.pipeline.max_lag = l;
            }
        }
        if let Ok(state) = std::env::var("WILDFIRE_AQI_STATE") {
            self.pipeline.state = state;
        }

        if let Ok(level) = std::env::var("WILDFIRE_AQI_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WILDFIRE_AQI_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Wildfire AQI Configuration
#
# Environment variables override these settings:
# - WILDFIRE_AQI_OUTPUT_DIR
# - WILDFIRE_AQI_MAX_LAG
# - WILDFIRE_AQI_STATE
# - WILDFIRE_AQI_LOG_LEVEL
# - WILDFIRE_AQI_LOG_FORMAT

[pipeline]
# Inclusive year window; records outside it are dropped
start_year = 2010
end_year = 2021

# Correlate at lag 0 through max_lag months
max_lag = 6

# Only AQI rows for this state are used
state = "New York"

[sources]
# One zip archive per region, each holding a single CSV
ontario = "Historical Fire Alerts in Ontario, Canada.zip"
quebec = "Historical Fire Alerts in Québec, Canada.zip"
newfoundland_and_labrador = "Historical Fire Alerts in Newfoundland and Labrador, Canada.zip"

# Daily county-level AQI table
daily_aqi = "aqi_daily_1980_to_2021_New_York.csv"

[schema.alerts]
year = "alert__year"
week = "alert__week"
count = "alert__count"

[schema.aqi]
date = "Date"
county = "County Name"
aqi = "AQI"
state = "State Name"

[output]
dir = "./output"
statewide_file = "monthly_statewide.csv"
county_file = "ny_monthly_county_aqi.csv"
merged_file = "merged_ny_vif.csv"
correlation_file = "vif_correlations.csv"

[county]
# Counties averaged as Downstate; everything else is Upstate
downstate = ["New York", "Kings", "Queens", "Bronx", "Richmond",
             "Nassau", "Suffolk", "Westchester", "Rockland", "Putnam"]

# Number of worst counties listed in summaries
top_n = 5

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pipeline.max_lag, 6);
        assert_eq!(config.pipeline.year_range().unwrap(), YearRange::default());
        assert_eq!(config.schema.alerts.week, "alert__week");
        assert_eq!(config.county.downstate.len(), 10);
        assert_eq!(
            config.output.regional_path(Region::Quebec),
            Path::new("./output").join("monthly_qc.csv")
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[pipeline]
max_lag = 3

[schema.alerts]
count = "alerts"
"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.max_lag, 3);
        assert_eq!(config.pipeline.start_year, 2010);
        assert_eq!(config.schema.alerts.count, "alerts");
        assert_eq!(config.schema.alerts.year, "alert__year");
    }

    #[test]
    fn test_invalid_year_range_rejected() {
        let err = Config::from_toml("[pipeline]\nstart_year = 2022\nend_year = 2010\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_column_rejected() {
        let err = Config::from_toml("[schema.aqi]\ndate = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("schema.aqi.date"));
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::from_toml(&generate_default_config()).unwrap();
        assert!(config.sources.archive(Region::NewfoundlandAndLabrador).is_some());
        assert_eq!(config.county.top_n, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\ndir = \"out\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output.merged_path(), Path::new("out").join("merged_ny_vif.csv"));

        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
