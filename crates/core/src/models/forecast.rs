use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Trading days assumed per year when sizing the default horizon.
pub const TRADING_DAYS_PER_YEAR: usize = 251;

/// Default forecast horizon in years.
pub const DEFAULT_HORIZON_YEARS: usize = 5;

/// Drift and volatility of one asset's per-period simple returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    pub symbol: String,
    /// Sample mean of returns.
    pub drift: f64,
    /// Sample standard deviation of returns (n − 1 denominator).
    pub volatility: f64,
    /// Number of return observations the estimate is based on.
    pub observations: usize,
}

/// How simulated asset values are combined into portfolio bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Take quantiles of each asset's value across paths, then add the
    /// per-asset quantiles together. Percentiles do not generally add, so
    /// this is an approximation of the portfolio distribution.
    #[default]
    PerAssetQuantiles,
    /// Add asset values path by path, then take quantiles of the summed
    /// portfolio value.
    JointPaths,
}

/// Monte Carlo forecast parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of simulated paths per asset.
    pub paths: usize,
    /// Number of time steps, including step 0 (the current price).
    pub steps: usize,
    /// Quantile levels, strictly increasing within (0, 1).
    pub quantiles: Vec<f64>,
    /// Master seed. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub aggregation: AggregationMode,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            paths: 1000,
            steps: TRADING_DAYS_PER_YEAR * DEFAULT_HORIZON_YEARS,
            quantiles: vec![0.05, 0.50, 0.95],
            seed: None,
            aggregation: AggregationMode::default(),
        }
    }
}

impl ForecastConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.paths == 0 {
            return Err(CoreError::Configuration("paths must be at least 1".into()));
        }
        if self.steps == 0 {
            return Err(CoreError::Configuration("steps must be at least 1".into()));
        }
        if self.quantiles.is_empty() {
            return Err(CoreError::Configuration("at least one quantile level is required".into()));
        }
        if let Some(q) = self.quantiles.iter().find(|q| !(**q > 0.0 && **q < 1.0)) {
            return Err(CoreError::Configuration(format!(
                "quantile level {q} must lie strictly between 0 and 1"
            )));
        }
        if self.quantiles.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::Configuration(
                "quantile levels must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}

/// Simulated prices for one asset, indexed by (path, step).
///
/// Stored step-major so each cross-section over paths is contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPathMatrix {
    paths: usize,
    steps: usize,
    values: Vec<f64>,
}

impl SimulatedPathMatrix {
    pub(crate) fn filled(paths: usize, steps: usize, value: f64) -> Self {
        Self {
            paths,
            steps,
            values: vec![value; paths * steps],
        }
    }

    pub fn paths(&self) -> usize {
        self.paths
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn get(&self, path: usize, step: usize) -> f64 {
        self.values[step * self.paths + path]
    }

    /// Every path's value at `step`.
    pub fn step(&self, step: usize) -> &[f64] {
        let start = step * self.paths;
        &self.values[start..start + self.paths]
    }

    /// Disjoint views of step `step - 1` and step `step`.
    pub(crate) fn step_pair_mut(&mut self, step: usize) -> (&[f64], &mut [f64]) {
        let (head, tail) = self.values.split_at_mut(step * self.paths);
        (&head[(step - 1) * self.paths..], &mut tail[..self.paths])
    }

    /// One path's trajectory across all steps.
    pub fn path(&self, path: usize) -> Vec<f64> {
        (0..self.steps).map(|s| self.get(path, s)).collect()
    }

    pub fn scale(&mut self, factor: f64) {
        self.values.iter_mut().for_each(|v| *v *= factor);
    }

    /// Element-wise add another matrix of the same shape.
    pub fn accumulate(&mut self, other: &SimulatedPathMatrix) -> Result<(), CoreError> {
        if self.paths != other.paths || self.steps != other.steps {
            return Err(CoreError::Configuration(format!(
                "cannot add a {}x{} path matrix to a {}x{} one",
                other.paths, other.steps, self.paths, self.steps
            )));
        }
        self.values
            .iter_mut()
            .zip(&other.values)
            .for_each(|(a, b)| *a += b);
        Ok(())
    }

    /// Quantiles across paths at every step: one row per level.
    pub fn quantile_bands(&self, levels: &[f64]) -> Vec<Vec<f64>> {
        let mut bands = vec![Vec::with_capacity(self.steps); levels.len()];
        let mut scratch = Vec::with_capacity(self.paths);
        for step in 0..self.steps {
            scratch.clear();
            scratch.extend_from_slice(self.step(step));
            scratch.sort_by(f64::total_cmp);
            for (band, &q) in bands.iter_mut().zip(levels) {
                band.push(quantile_of_sorted(&scratch, q));
            }
        }
        bands
    }
}

/// Linearly interpolated quantile of an ascending slice.
///
/// Uses the `(n - 1) * q` position rule, so the result is monotone in `q`.
pub fn quantile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = (n - 1) as f64 * q.clamp(0.0, 1.0);
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Label used for a quantile level, e.g. `0.05` → `"5%"`, `0.025` → `"2.5%"`.
pub fn quantile_label(level: f64) -> String {
    let pct = (level * 10_000.0).round() / 100.0;
    format!("{pct}%")
}

/// Portfolio value at one quantile level across the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileBand {
    pub level: f64,
    pub label: String,
    pub values: Vec<f64>,
}

/// Portfolio value bands over the forecast horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileForecast {
    pub paths: usize,
    pub steps: usize,
    pub aggregation: AggregationMode,
    /// Bands in increasing level order.
    pub bands: Vec<QuantileBand>,
    /// Per-asset statistics the simulation ran with, in symbol order.
    pub assets: Vec<ReturnStatistics>,
}

impl QuantileForecast {
    /// Band by label, e.g. `"50%"`.
    pub fn band(&self, label: &str) -> Option<&[f64]> {
        self.bands
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.values.as_slice())
    }

    /// Band by level, e.g. `0.5`.
    pub fn band_at(&self, level: f64) -> Option<&[f64]> {
        self.bands
            .iter()
            .find(|b| (b.level - level).abs() < 1e-12)
            .map(|b| b.values.as_slice())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.label.as_str()).collect()
    }

    /// Lowest configured band.
    pub fn lower(&self) -> Option<&[f64]> {
        self.bands.first().map(|b| b.values.as_slice())
    }

    pub fn median(&self) -> Option<&[f64]> {
        self.band_at(0.5)
    }

    /// Highest configured band.
    pub fn upper(&self) -> Option<&[f64]> {
        self.bands.last().map(|b| b.values.as_slice())
    }

    /// Portfolio value at step 0 (identical across bands).
    pub fn initial_value(&self) -> Option<f64> {
        self.bands.first().and_then(|b| b.values.first().copied())
    }
}
