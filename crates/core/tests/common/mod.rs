// ═══════════════════════════════════════════════════════════════════
// Shared test doubles for MarketDataClient
// ═══════════════════════════════════════════════════════════════════

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use portfolio_forecast_core::errors::CoreError;
use portfolio_forecast_core::models::price::{Interval, Period, PricePoint, PriceSeries};
use portfolio_forecast_core::providers::traits::MarketDataClient;

/// Daily series starting 2024-01-01, one close per day, oldest first.
pub fn daily_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::on_date(start + Duration::days(i as i64), c))
        .collect();
    PriceSeries::new(symbol, points).unwrap()
}

/// Same closes, stored newest first.
pub fn daily_series_newest_first(symbol: &str, closes: &[f64]) -> PriceSeries {
    let mut points = daily_series(symbol, closes).points().to_vec();
    points.reverse();
    PriceSeries::new(symbol, points).unwrap()
}

// ── Fixed snapshot ──────────────────────────────────────────────────

/// Serves a fixed snapshot of histories and latest prices.
/// Unknown symbols fail with `Api` (transient, so retries are exercised).
#[derive(Default)]
pub struct MockClient {
    histories: HashMap<String, PriceSeries>,
    prices: HashMap<String, f64>,
    pub calls: Arc<AtomicUsize>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol whose latest price is its last close.
    pub fn with_series(mut self, symbol: &str, closes: &[f64]) -> Self {
        let series = daily_series(symbol, closes);
        if let Some(last) = closes.last() {
            self.prices.insert(symbol.to_uppercase(), *last);
        }
        self.histories.insert(symbol.to_uppercase(), series);
        self
    }

    pub fn with_history(mut self, series: PriceSeries) -> Self {
        self.histories.insert(series.symbol().to_string(), series);
        self
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_uppercase(), price);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataClient for MockClient {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn get_history(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| CoreError::Api {
                provider: "Mock".into(),
                message: format!("unknown symbol {symbol}"),
            })
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<f64, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| CoreError::Api {
                provider: "Mock".into(),
                message: format!("unknown symbol {symbol}"),
            })
    }
}

// ── Always failing ──────────────────────────────────────────────────

/// Fails every call with a network error.
#[derive(Default)]
pub struct FailingClient {
    pub calls: Arc<AtomicUsize>,
}

impl FailingClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketDataClient for FailingClient {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn get_history(
        &self,
        _symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Network("connection refused".into()))
    }

    async fn get_latest_price(&self, _symbol: &str) -> Result<f64, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Network("connection refused".into()))
    }
}

// ── Slow ────────────────────────────────────────────────────────────

/// Sleeps longer than any sane timeout before answering.
pub struct SlowClient {
    pub delay_ms: u64,
    pub calls: Arc<AtomicUsize>,
}

impl SlowClient {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl MarketDataClient for SlowClient {
    fn name(&self) -> &str {
        "Slow"
    }

    async fn get_history(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        Ok(daily_series(symbol, &[1.0, 2.0]))
    }

    async fn get_latest_price(&self, _symbol: &str) -> Result<f64, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        Ok(1.0)
    }
}

// ── Flaky ───────────────────────────────────────────────────────────

/// Fails the first `failures` calls with a network error, then answers
/// with `price` / a two-point series.
pub struct FlakyClient {
    failures: usize,
    price: f64,
    pub calls: Arc<AtomicUsize>,
}

impl FlakyClient {
    pub fn new(failures: usize, price: f64) -> Self {
        Self {
            failures,
            price,
            calls: Arc::default(),
        }
    }

    fn attempt(&self) -> Result<(), CoreError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(CoreError::Network(format!("flaky failure #{}", n + 1)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MarketDataClient for FlakyClient {
    fn name(&self) -> &str {
        "Flaky"
    }

    async fn get_history(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        self.attempt()?;
        Ok(daily_series(symbol, &[self.price, self.price]))
    }

    async fn get_latest_price(&self, _symbol: &str) -> Result<f64, CoreError> {
        self.attempt()?;
        Ok(self.price)
    }
}

// ── Garbage ─────────────────────────────────────────────────────────

/// Answers every price lookup with the same (possibly invalid) number.
pub struct FixedPriceClient(pub f64);

#[async_trait]
impl MarketDataClient for FixedPriceClient {
    fn name(&self) -> &str {
        "Fixed"
    }

    async fn get_history(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        Ok(daily_series(symbol, &[100.0, 101.0]))
    }

    async fn get_latest_price(&self, _symbol: &str) -> Result<f64, CoreError> {
        Ok(self.0)
    }
}

// ── In-flight tracking ──────────────────────────────────────────────

/// Holds every call open for `delay_ms` and records the highest number of
/// calls that were outstanding at the same time.
pub struct InFlightClient {
    pub delay_ms: u64,
    in_flight: AtomicUsize,
    pub peak: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl InFlightClient {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            in_flight: AtomicUsize::new(0),
            peak: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn hold(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataClient for InFlightClient {
    fn name(&self) -> &str {
        "InFlight"
    }

    async fn get_history(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        self.hold().await;
        Ok(daily_series(symbol, &[100.0, 101.0, 100.5]))
    }

    async fn get_latest_price(&self, _symbol: &str) -> Result<f64, CoreError> {
        self.hold().await;
        Ok(100.5)
    }
}
