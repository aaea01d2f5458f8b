use futures::stream::{self, StreamExt, TryStreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::future::Future;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task;

use crate::errors::CoreError;
use crate::models::forecast::{
    quantile_label, AggregationMode, ForecastConfig, QuantileBand, QuantileForecast,
    ReturnStatistics, SimulatedPathMatrix,
};
use crate::models::ledger::Ledger;
use crate::models::price::{Interval, Period, PriceSeries};
use crate::providers::traits::MarketDataClient;
use crate::services::gbm_simulator::GbmSimulator;
use crate::services::return_estimator::ReturnEstimator;

/// Everything the simulation needs about one holding.
#[derive(Debug, Clone)]
pub struct ForecastInput {
    pub symbol: String,
    pub quantity: f64,
    /// Seed price for step 0.
    pub current_price: f64,
    /// History the drift and volatility are estimated from.
    pub history: PriceSeries,
}

/// Projects portfolio value by simulating every holding under GBM.
///
/// Fetching happens once up front (bounded concurrency, all-or-nothing);
/// simulation then fans out one holding per rayon task. Each task owns its
/// generator and its path matrix, and results are combined in symbol order,
/// so a seeded run gives the same bands on any number of threads.
#[derive(Clone)]
pub struct ForecastService {
    estimator: ReturnEstimator,
}

impl ForecastService {
    pub fn new() -> Self {
        Self {
            estimator: ReturnEstimator::new(),
        }
    }

    /// Fetch history and latest price for every holding, then forecast.
    ///
    /// At most `max_concurrent` provider calls are outstanding at once,
    /// counting history and latest-price lookups separately. Any failed
    /// lookup fails the whole forecast with that symbol's `DataUnavailable`
    /// error. The compute stage runs on the blocking pool.
    pub async fn forecast(
        &self,
        ledger: &Ledger,
        client: &dyn MarketDataClient,
        period: Period,
        interval: Interval,
        config: &ForecastConfig,
        max_concurrent: usize,
    ) -> Result<QuantileForecast, CoreError> {
        config.validate()?;
        if interval != Interval::OneDay {
            return Err(CoreError::Configuration(format!(
                "forecast history must use daily bars, got {interval}"
            )));
        }
        if ledger.is_empty() {
            return Err(CoreError::ValidationError(
                "Cannot forecast an empty ledger".into(),
            ));
        }

        let limit = max_concurrent.max(1);
        let permits = Semaphore::new(limit);
        let permits = &permits;
        let inputs: Vec<ForecastInput> = stream::iter(ledger.holdings())
            .map(|holding| async move {
                let symbol = holding.symbol();
                let (history, current_price) = futures::try_join!(
                    throttled(permits, client.get_history(symbol, period, interval)),
                    throttled(permits, client.get_latest_price(symbol)),
                )
                .map_err(|e| CoreError::data_unavailable(symbol, e))?;
                Ok::<_, CoreError>(ForecastInput {
                    symbol: symbol.to_string(),
                    quantity: holding.quantity(),
                    current_price,
                    history,
                })
            })
            .buffered(limit)
            .try_collect()
            .await?;

        let service = self.clone();
        let config = config.clone();
        task::spawn_blocking(move || service.forecast_from_inputs(&inputs, &config))
            .await
            .map_err(|e| CoreError::SimulationAborted(e.to_string()))?
    }

    /// Pure compute stage: estimate, simulate, aggregate, extract bands.
    pub fn forecast_from_inputs(
        &self,
        inputs: &[ForecastInput],
        config: &ForecastConfig,
    ) -> Result<QuantileForecast, CoreError> {
        config.validate()?;
        if inputs.is_empty() {
            return Err(CoreError::ValidationError(
                "Cannot forecast without holdings".into(),
            ));
        }
        for input in inputs {
            if !input.quantity.is_finite() || input.quantity <= 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "Quantity for {} must be positive, got {}",
                    input.symbol, input.quantity
                )));
            }
        }

        // Estimate everything before simulating anything.
        let stats: Vec<ReturnStatistics> = inputs
            .iter()
            .map(|input| self.estimator.estimate(&input.history))
            .collect::<Result<_, _>>()?;

        let mut master = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeds: Vec<u64> = inputs.iter().map(|_| master.gen()).collect();

        let started = Instant::now();
        let levels = &config.quantiles;
        let band_values = match config.aggregation {
            AggregationMode::PerAssetQuantiles => {
                let per_asset: Vec<Vec<Vec<f64>>> = inputs
                    .par_iter()
                    .zip(stats.par_iter())
                    .zip(seeds.par_iter())
                    .map(|((input, stat), seed)| {
                        let matrix = simulate_holding(input, stat, *seed, config)?;
                        Ok(matrix.quantile_bands(levels))
                    })
                    .collect::<Result<_, CoreError>>()?;
                sum_bands(per_asset, levels.len(), config.steps)
            }
            AggregationMode::JointPaths => {
                let matrices: Vec<SimulatedPathMatrix> = inputs
                    .par_iter()
                    .zip(stats.par_iter())
                    .zip(seeds.par_iter())
                    .map(|((input, stat), seed)| simulate_holding(input, stat, *seed, config))
                    .collect::<Result<_, CoreError>>()?;
                let mut matrices = matrices.into_iter();
                let mut total = matrices
                    .next()
                    .ok_or_else(|| CoreError::ValidationError("Cannot forecast without holdings".into()))?;
                for matrix in matrices {
                    total.accumulate(&matrix)?;
                }
                total.quantile_bands(levels)
            }
        };

        log::info!(
            "Forecast {} holdings × {} paths × {} steps ({:?}) in {:?}",
            inputs.len(),
            config.paths,
            config.steps,
            config.aggregation,
            started.elapsed()
        );

        let bands = levels
            .iter()
            .zip(band_values)
            .map(|(&level, values)| QuantileBand {
                level,
                label: quantile_label(level),
                values,
            })
            .collect();

        Ok(QuantileForecast {
            paths: config.paths,
            steps: config.steps,
            aggregation: config.aggregation,
            bands,
            assets: stats,
        })
    }
}

impl Default for ForecastService {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `call` once a permit is free.
async fn throttled<T>(
    permits: &Semaphore,
    call: impl Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    let _permit = permits
        .acquire()
        .await
        .map_err(|e| CoreError::Network(e.to_string()))?;
    call.await
}

/// Simulated dollar value of one holding: per-unit GBM paths × quantity.
fn simulate_holding(
    input: &ForecastInput,
    stats: &ReturnStatistics,
    seed: u64,
    config: &ForecastConfig,
) -> Result<SimulatedPathMatrix, CoreError> {
    let mut simulator = GbmSimulator::seeded(seed);
    let mut matrix = simulator
        .simulate_paths(
            input.current_price,
            config.paths,
            config.steps,
            stats.drift,
            stats.volatility,
        )
        .map_err(|e| match e {
            CoreError::Configuration(msg) => {
                CoreError::Configuration(format!("{}: {msg}", input.symbol))
            }
            other => other,
        })?;
    matrix.scale(input.quantity);
    Ok(matrix)
}

/// Add per-asset bands level by level, in input order.
fn sum_bands(per_asset: Vec<Vec<Vec<f64>>>, levels: usize, steps: usize) -> Vec<Vec<f64>> {
    let mut totals = vec![vec![0.0; steps]; levels];
    for asset_bands in per_asset {
        for (total, band) in totals.iter_mut().zip(asset_bands) {
            for (t, v) in total.iter_mut().zip(band) {
                *t += v;
            }
        }
    }
    totals
}
