//! Lag-Correlation Engine
//!
//! Pearson correlation between each regional alert column and statewide AQI
//! at lag 0 through `max_lag`. At lag L the alert value in row i is paired
//! with the AQI value in row i + L; the last L rows have no partner and drop
//! out, as do rows where the region reported nothing.
//!
//! A coefficient is only defined with at least two pairs and non-zero
//! variance on both sides. Otherwise it is `Coefficient::Undefined`, never 0.

use crate::merge::MergedTable;
use crate::series::Region;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fewest pairs a defined coefficient needs
pub const MIN_SAMPLES: usize = 2;

/// Why a coefficient could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    InsufficientSamples,
    ZeroVariance,
}

/// Outcome of one correlation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coefficient {
    /// Pearson r in [-1, 1]
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Coefficient {
    pub fn value(&self) -> Option<f64> {
        match self {
            Coefficient::Defined(r) => Some(*r),
            Coefficient::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Coefficient::Defined(_))
    }
}

/// Correlation of one region's alerts with AQI at one lag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagCorrelation {
    pub region: Region,
    pub lag: usize,
    /// Number of (alert, shifted AQI) pairs used
    pub samples: usize,
    pub coefficient: Coefficient,
}

/// Serializable view of a `LagCorrelation`
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationEntry {
    pub region: Region,
    pub lag: String,
    pub samples: usize,
    /// `null` when undefined
    pub coefficient: Option<f64>,
    pub undefined_reason: Option<UndefinedReason>,
    /// "strong", "moderate", "weak", "negligible"
    pub strength: Option<&'static str>,
    /// "positive" or "negative"
    pub direction: Option<&'static str>,
}

impl From<&LagCorrelation> for CorrelationEntry {
    fn from(c: &LagCorrelation) -> Self {
        let value = c.coefficient.value();
        Self {
            region: c.region,
            lag: lag_label(c.lag),
            samples: c.samples,
            coefficient: value,
            undefined_reason: match c.coefficient {
                Coefficient::Undefined(reason) => Some(reason),
                Coefficient::Defined(_) => None,
            },
            strength: value.map(correlation_strength),
            direction: value.map(|r| if r >= 0.0 { "positive" } else { "negative" }),
        }
    }
}

/// `lag_0`, `lag_1`, ...
pub fn lag_label(lag: usize) -> String {
    format!("lag_{}", lag)
}

/// Coefficients for every lag and region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationTable {
    max_lag: usize,
    cells: BTreeMap<usize, BTreeMap<Region, LagCorrelation>>,
}

impl CorrelationTable {
    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    /// Lags in increasing order
    pub fn lags(&self) -> impl Iterator<Item = usize> {
        0..=self.max_lag
    }

    pub fn get(&self, lag: usize, region: Region) -> Option<&LagCorrelation> {
        self.cells.get(&lag).and_then(|row| row.get(&region))
    }

    /// All cells ordered by region, then lag
    pub fn entries(&self) -> Vec<CorrelationEntry> {
        Region::all()
            .iter()
            .flat_map(|region| self.lags().filter_map(move |lag| self.get(lag, *region)))
            .map(CorrelationEntry::from)
            .collect()
    }

    pub fn undefined_count(&self) -> usize {
        self.cells
            .values()
            .flat_map(|row| row.values())
            .filter(|c| !c.coefficient.is_defined())
            .count()
    }
}

/// Computes lagged correlations against AQI
#[derive(Debug, Clone, Copy)]
pub struct LagCorrelationEngine {
    max_lag: usize,
}

impl Default for LagCorrelationEngine {
    fn default() -> Self {
        Self { max_lag: 6 }
    }
}

impl LagCorrelationEngine {
    pub fn new(max_lag: usize) -> Self {
        Self { max_lag }
    }

    /// Correlate every region with AQI at lags 0..=max_lag
    pub fn compute(&self, table: &MergedTable) -> CorrelationTable {
        let aqi = table.aqi_column();
        let mut cells: BTreeMap<usize, BTreeMap<Region, LagCorrelation>> = BTreeMap::new();

        for region in Region::all() {
            let alerts = table.alert_column(*region);
            for lag in 0..=self.max_lag {
                let (x, y) = lagged_pairs(&alerts, &aqi, lag);
                let coefficient = match pearson_correlation(&x, &y) {
                    Ok(r) => Coefficient::Defined(r),
                    Err(reason) => {
                        tracing::warn!(
                            %region,
                            lag,
                            samples = x.len(),
                            ?reason,
                            "Correlation undefined"
                        );
                        Coefficient::Undefined(reason)
                    }
                };

                cells.entry(lag).or_default().insert(
                    *region,
                    LagCorrelation {
                        region: *region,
                        lag,
                        samples: x.len(),
                        coefficient,
                    },
                );
            }
        }

        tracing::info!(rows = table.len(), max_lag = self.max_lag, "Computed lag correlations");
        CorrelationTable {
            max_lag: self.max_lag,
            cells,
        }
    }
}

/// Pair `alerts[i]` with `aqi[i + lag]`, skipping null alerts
fn lagged_pairs(alerts: &[Option<f64>], aqi: &[f64], lag: usize) -> (Vec<f64>, Vec<f64>) {
    alerts
        .iter()
        .zip(aqi.iter().skip(lag))
        .filter_map(|(a, q)| a.map(|a| (a, *q)))
        .unzip()
}

/// Calculate Pearson correlation coefficient
///
/// Returns a value between -1 and 1:
/// - 1: perfect positive correlation
/// - 0: no correlation
/// - -1: perfect negative correlation
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64, UndefinedReason> {
    let n = x.len().min(y.len());
    if n < MIN_SAMPLES {
        return Err(UndefinedReason::InsufficientSamples);
    }
    let (x, y) = (&x[..n], &y[..n]);

    // exact check; the centered sums below can leave rounding residue
    if x.iter().all(|v| *v == x[0]) || y.iter().all(|v| *v == y[0]) {
        return Err(UndefinedReason::ZeroVariance);
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(UndefinedReason::ZeroVariance);
    }

    Ok((cov / denominator).clamp(-1.0, 1.0))
}

/// Convert correlation coefficient to human-readable strength
pub fn correlation_strength(r: f64) -> &'static str {
    let abs_r = r.abs();
    if abs_r > 0.7 {
        "strong"
    } else if abs_r > 0.5 {
        "moderate"
    } else if abs_r > 0.3 {
        "weak"
    } else {
        "negligible"
    }
}
