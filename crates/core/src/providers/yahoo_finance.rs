use async_trait::async_trait;
use chrono::DateTime;

use crate::errors::CoreError;
use crate::models::price::{Interval, Period, PricePoint, PriceSeries};
use super::traits::MarketDataClient;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance market data provider.
///
/// - **Free**: No API key required.
/// - **No strict rate limits** (unofficial public API).
/// - **Coverage**: Global equities, ETFs, indices, mutual funds.
///
/// Uses the `yahoo_finance_api` crate. Yahoo's range/interval vocabulary
/// matches [`Period`] and [`Interval`] one-to-one, so requests are passed
/// through unchanged. Prices are in the instrument's native currency.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to create connector: {e}"),
            })?;
        Ok(Self { connector })
    }
}

#[async_trait]
impl MarketDataClient for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        let resp = self
            .connector
            .get_quote_range(symbol, interval.as_str(), period.as_str())
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch {period} history for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let timestamp = DateTime::from_timestamp(q.timestamp as i64, 0)?;
                Some(PricePoint::new(timestamp, q.close))
            })
            .collect();

        Ok(PriceSeries::from_unsorted(symbol, points))
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<f64, CoreError> {
        let resp = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch latest quote for {symbol}: {e}"),
            })?;

        let quote = resp.last_quote().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No quote data for {symbol}: {e}"),
        })?;

        Ok(quote.close)
    }
}
