pub mod errors;
pub mod models;
pub mod providers;
pub mod renderers;
pub mod services;

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt, TryStreamExt};
use models::{
    analytics::PortfolioSummary,
    chart::ChartData,
    forecast::QuantileForecast,
    holding::{CategoryKind, Holding},
    ledger::Ledger,
    price::{Interval, Period, PriceSeries},
    settings::Settings,
};
use providers::{registry::MarketDataRegistry, traits::MarketDataClient};
use renderers::traits::ReportRenderer;
use services::{
    analytics_service::AnalyticsService, chart_service::ChartService,
    forecast_service::ForecastService, ledger_service::LedgerService,
    price_service::PriceService,
};

use errors::CoreError;

/// Main entry point for the portfolio forecast core library.
/// Holds the ledger, the settings and all services needed to operate on them.
#[must_use]
pub struct PortfolioTracker {
    ledger: Ledger,
    settings: Settings,
    price_service: PriceService,
    ledger_service: LedgerService,
    forecast_service: ForecastService,
    analytics_service: AnalyticsService,
    chart_service: ChartService,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("holdings", &self.ledger.len())
            .field("settings", &self.settings)
            .field("providers", &self.price_service.provider_names())
            .finish()
    }
}

impl PortfolioTracker {
    /// Create an empty tracker backed by the default providers.
    ///
    /// Yahoo Finance is always registered; Alpha Vantage is added as a
    /// fallback when `settings.api_keys` holds an `"alphavantage"` key.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        let registry = MarketDataRegistry::new_with_defaults(&settings.api_keys);
        Ok(Self::build(settings, registry))
    }

    /// Create an empty tracker over an explicit set of providers.
    pub fn with_registry(settings: Settings, registry: MarketDataRegistry) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(settings, registry))
    }

    // ── Ledger ──────────────────────────────────────────────────────

    /// Add a holding priced at the latest available close.
    pub async fn add_holding(
        &mut self,
        symbol: &str,
        sector: &str,
        asset_class: &str,
        quantity: f64,
        purchase_price: f64,
    ) -> Result<(), CoreError> {
        self.ledger_service
            .add_holding(
                &mut self.ledger,
                &self.price_service,
                symbol,
                sector,
                asset_class,
                quantity,
                purchase_price,
            )
            .await
    }

    /// Refetch the latest price of every holding. All-or-nothing.
    pub async fn refresh_prices(&mut self) -> Result<(), CoreError> {
        self.ledger_service
            .refresh_prices(
                &mut self.ledger,
                &self.price_service,
                self.settings.fetch.max_concurrent,
            )
            .await
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// All holdings, ordered by symbol.
    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.ledger.holdings()
    }

    #[must_use]
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.ledger.get(symbol)
    }

    /// Sum of `quantity × latest price` over all holdings.
    #[must_use]
    pub fn total_value(&self) -> f64 {
        self.ledger.total_value()
    }

    /// Share of total value per sector or asset class. Shares sum to 1.
    #[must_use]
    pub fn value_by_category(&self, kind: CategoryKind) -> BTreeMap<String, f64> {
        self.ledger.value_by_category(kind)
    }

    // ── Analytics ───────────────────────────────────────────────────

    #[must_use]
    pub fn summary(&self) -> PortfolioSummary {
        self.analytics_service.summarize(&self.ledger)
    }

    // ── Market data ─────────────────────────────────────────────────

    /// Historical closes for one symbol through the resilient price service.
    pub async fn price_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        self.price_service.get_history(symbol, period, interval).await
    }

    /// Names of the registered providers, in fallback order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.price_service.provider_names()
    }

    // ── Forecast ────────────────────────────────────────────────────

    /// Monte Carlo projection of the whole ledger using the configured
    /// history window and forecast parameters.
    pub async fn forecast(&self) -> Result<QuantileForecast, CoreError> {
        self.forecast_service
            .forecast(
                &self.ledger,
                &self.price_service,
                self.settings.history_period,
                self.settings.history_interval,
                &self.settings.forecast,
                self.settings.fetch.max_concurrent,
            )
            .await
    }

    // ── Charts ──────────────────────────────────────────────────────

    /// Aligned close-price lines for `symbols` over `period`.
    pub async fn history_chart(&self, symbols: &[&str], period: Period) -> Result<ChartData, CoreError> {
        if symbols.is_empty() {
            return Err(CoreError::ValidationError(
                "At least one symbol is required for a history chart".into(),
            ));
        }
        let interval = self.settings.history_interval;
        let series: Vec<PriceSeries> = stream::iter(symbols.iter().copied())
            .map(|symbol| self.price_service.get_history(symbol, period, interval))
            .buffered(self.settings.fetch.max_concurrent.max(1))
            .try_collect()
            .await?;
        Ok(self.chart_service.price_history_chart(&series))
    }

    #[must_use]
    pub fn allocation_chart(&self, kind: CategoryKind) -> ChartData {
        self.chart_service.allocation_chart(&self.ledger, kind)
    }

    #[must_use]
    pub fn forecast_chart(&self, forecast: &QuantileForecast) -> ChartData {
        self.chart_service.forecast_chart(forecast)
    }

    /// Hand a chart to a renderer.
    pub fn render(&self, renderer: &dyn ReportRenderer, chart: &ChartData) -> Result<(), CoreError> {
        renderer.render(chart)
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(settings: Settings, registry: MarketDataRegistry) -> Self {
        let price_service = PriceService::new(registry, settings.fetch.clone());
        Self {
            ledger: Ledger::new(),
            settings,
            price_service,
            ledger_service: LedgerService::new(),
            forecast_service: ForecastService::new(),
            analytics_service: AnalyticsService::new(),
            chart_service: ChartService::new(),
        }
    }
}
