use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::price::{Interval, Period, PriceSeries};

/// Source of historical and latest close prices.
///
/// Each market data API (Yahoo Finance, Alpha Vantage) implements this
/// trait, and so does `PriceService`, which layers timeouts, retries and
/// provider fallback on top of a registry of them. The ledger and the
/// forecaster only ever see this trait.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Human-readable name of this client (for logs/errors).
    fn name(&self) -> &str;

    /// Close prices for `symbol` over `period`, one bar per `interval`.
    ///
    /// The returned series is consistently ordered, but callers must not
    /// assume in which direction.
    async fn get_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, CoreError>;

    /// Most recent close price for `symbol`.
    async fn get_latest_price(&self, symbol: &str) -> Result<f64, CoreError>;
}
