use crate::errors::CoreError;
use crate::models::forecast::ReturnStatistics;
use crate::models::price::PriceSeries;

/// Reduces a price history to drift and volatility of its simple returns.
///
/// Pure computation: no I/O, no state.
#[derive(Debug, Clone, Copy)]
pub struct ReturnEstimator;

impl ReturnEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Period-over-period simple returns `(p[i] - p[i-1]) / p[i-1]`, taken in
    /// chronological order whatever the series' stored direction.
    pub fn simple_returns(&self, series: &PriceSeries) -> Vec<f64> {
        series
            .chronological_closes()
            .windows(2)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }

    /// Sample mean and sample standard deviation (n − 1) of simple returns.
    ///
    /// A single return observation has no sample spread; its volatility is
    /// reported as 0.
    pub fn estimate(&self, series: &PriceSeries) -> Result<ReturnStatistics, CoreError> {
        if series.len() < 2 {
            return Err(CoreError::InsufficientData {
                symbol: series.symbol().to_string(),
                points: series.len(),
            });
        }

        let returns = self.simple_returns(series);
        let n = returns.len() as f64;
        let drift = returns.iter().sum::<f64>() / n;
        let volatility = if returns.len() > 1 {
            let ss: f64 = returns.iter().map(|r| (r - drift).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Ok(ReturnStatistics {
            symbol: series.symbol().to_string(),
            drift,
            volatility,
            observations: returns.len(),
        })
    }
}

impl Default for ReturnEstimator {
    fn default() -> Self {
        Self::new()
    }
}
