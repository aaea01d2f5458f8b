use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;

use super::forecast::ForecastConfig;
use super::price::{Interval, Period};

/// User-configurable settings. Loadable from JSON; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,

    /// History window used to estimate drift and volatility.
    pub history_period: Period,

    /// Bar size of the estimation history. The simulator steps one trading
    /// day at a time, so only daily bars are accepted.
    pub history_interval: Interval,

    pub fetch: FetchSettings,

    pub forecast: ForecastConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            history_period: Period::FiveYears,
            history_interval: Interval::OneDay,
            fetch: FetchSettings::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.history_interval != Interval::OneDay {
            return Err(CoreError::Configuration(format!(
                "history interval must be daily to match the simulation step, got {}",
                self.history_interval
            )));
        }
        self.fetch.validate()?;
        self.forecast.validate()
    }
}

/// Policy applied to every call made to an external market data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-call timeout.
    pub timeout_ms: u64,

    /// Extra attempts per provider after the first failure.
    pub retries: u32,

    /// Delay before retry `n` is `n × retry_backoff_ms`.
    pub retry_backoff_ms: u64,

    /// Upper bound on simultaneously outstanding fetches.
    pub max_concurrent: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retries: 2,
            retry_backoff_ms: 250,
            max_concurrent: 4,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.timeout_ms == 0 {
            return Err(CoreError::Configuration("fetch timeout must be positive".into()));
        }
        if self.max_concurrent == 0 {
            return Err(CoreError::Configuration(
                "at least one concurrent fetch must be allowed".into(),
            ));
        }
        Ok(())
    }
}
