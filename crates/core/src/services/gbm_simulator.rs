use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::errors::CoreError;
use crate::models::forecast::SimulatedPathMatrix;

/// Monte Carlo simulator for one asset under geometric Brownian motion.
///
/// Uses the exact solution of the GBM SDE over each interval:
///
/// `S(t + dt) = S(t) · exp((μ − σ²/2)·dt + σ·W)`, with `W ~ N(0, dt)`
///
/// so any positive `dt` is valid. The simulator owns its random source;
/// seed it for reproducible runs and give every parallel worker its own.
pub struct GbmSimulator<R: Rng = StdRng> {
    rng: R,
}

impl GbmSimulator<StdRng> {
    /// Deterministic simulator.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Simulator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> GbmSimulator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Advance every path in `current` by one interval of length `dt`.
    pub fn simulate_step(
        &mut self,
        current: &[f64],
        dt: f64,
        drift: f64,
        volatility: f64,
    ) -> Result<Vec<f64>, CoreError> {
        validate_process(drift, volatility)?;
        validate_dt(dt)?;
        let mut next = vec![0.0; current.len()];
        self.step_into(current, &mut next, dt, drift, volatility);
        Ok(next)
    }

    /// Simulate `paths` trajectories over `steps` unit-length steps.
    ///
    /// Step 0 is `initial_price` on every path.
    pub fn simulate_paths(
        &mut self,
        initial_price: f64,
        paths: usize,
        steps: usize,
        drift: f64,
        volatility: f64,
    ) -> Result<SimulatedPathMatrix, CoreError> {
        if steps == 0 {
            return Err(CoreError::Configuration("steps must be at least 1".into()));
        }
        let timeline: Vec<f64> = (0..steps).map(|i| i as f64).collect();
        self.simulate_on_timeline(initial_price, paths, &timeline, drift, volatility)
    }

    /// Simulate `paths` trajectories observed at each point of `timeline`.
    ///
    /// The timeline must be strictly increasing; step `i` advances step
    /// `i − 1` by `timeline[i] − timeline[i − 1]`.
    pub fn simulate_on_timeline(
        &mut self,
        initial_price: f64,
        paths: usize,
        timeline: &[f64],
        drift: f64,
        volatility: f64,
    ) -> Result<SimulatedPathMatrix, CoreError> {
        if paths == 0 {
            return Err(CoreError::Configuration("paths must be at least 1".into()));
        }
        if timeline.is_empty() {
            return Err(CoreError::Configuration("steps must be at least 1".into()));
        }
        if !initial_price.is_finite() || initial_price <= 0.0 {
            return Err(CoreError::Configuration(format!(
                "initial price must be positive, got {initial_price}"
            )));
        }
        validate_process(drift, volatility)?;
        for w in timeline.windows(2) {
            validate_dt(w[1] - w[0])?;
        }

        let mut matrix = SimulatedPathMatrix::filled(paths, timeline.len(), initial_price);
        for step in 1..timeline.len() {
            let dt = timeline[step] - timeline[step - 1];
            let (prev, next) = matrix.step_pair_mut(step);
            self.step_into(prev, next, dt, drift, volatility);
        }
        Ok(matrix)
    }

    fn step_into(&mut self, current: &[f64], next: &mut [f64], dt: f64, drift: f64, volatility: f64) {
        let log_drift = (drift - 0.5 * volatility * volatility) * dt;
        if volatility == 0.0 {
            let growth = log_drift.exp();
            for (n, c) in next.iter_mut().zip(current) {
                *n = c * growth;
            }
            return;
        }

        let sqrt_dt = dt.sqrt();
        for (n, c) in next.iter_mut().zip(current) {
            let z: f64 = self.rng.sample(StandardNormal);
            *n = c * (log_drift + volatility * sqrt_dt * z).exp();
        }
    }
}

fn validate_process(drift: f64, volatility: f64) -> Result<(), CoreError> {
    if !drift.is_finite() {
        return Err(CoreError::Configuration(format!("drift must be finite, got {drift}")));
    }
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(CoreError::Configuration(format!(
            "volatility must be finite and non-negative, got {volatility}"
        )));
    }
    Ok(())
}

fn validate_dt(dt: f64) -> Result<(), CoreError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(CoreError::Configuration(format!(
            "time steps must be strictly increasing, got dt = {dt}"
        )));
    }
    Ok(())
}
