use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::{Interval, Period, PricePoint, PriceSeries};
use super::traits::MarketDataClient;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage market data provider.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set via settings as "alphavantage").
/// - **Coverage**: 100k+ global equity symbols.
///
/// Alpha Vantage has no notion of a period, so the full series for the
/// requested bar size is fetched and trimmed to the period window locally.
/// Intraday timestamps are US/Eastern wall-clock times; they are labelled
/// UTC without conversion, so hourly bars are offset by the Eastern UTC offset.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the provider at a different endpoint (e.g. a local mirror).
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            base_url: base_url.into(),
        }
    }

    /// API function and JSON key of the series payload for an interval.
    fn series_endpoint(interval: Interval) -> (&'static str, &'static str) {
        match interval {
            Interval::OneHour => ("TIME_SERIES_INTRADAY", "Time Series (60min)"),
            Interval::OneDay => ("TIME_SERIES_DAILY", "Time Series (Daily)"),
            Interval::OneWeek => ("TIME_SERIES_WEEKLY", "Weekly Time Series"),
            Interval::OneMonth => ("TIME_SERIES_MONTHLY", "Monthly Time Series"),
        }
    }

    /// Compact daily output covers the last 100 bars; anything longer
    /// than roughly four months needs the full series.
    fn output_size(period: Period) -> &'static str {
        match period {
            Period::OneDay | Period::FiveDays | Period::OneMonth | Period::ThreeMonths => "compact",
            _ => "full",
        }
    }

    fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(Utc.from_utc_datetime(&dt));
        }
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
        Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
    }

    /// Reject bodies that carry an error or rate-limit message instead of data.
    /// Alpha Vantage answers those with HTTP 200.
    fn check_body(symbol: &str, body: &Map<String, Value>) -> Result<(), CoreError> {
        for key in ["Error Message", "Note", "Information"] {
            if let Some(msg) = body.get(key) {
                return Err(CoreError::Api {
                    provider: PROVIDER.into(),
                    message: format!("{symbol}: {}", msg.as_str().unwrap_or("request rejected")),
                });
            }
        }
        Ok(())
    }

    /// Parse a time series response body into a series limited to `period`
    /// (measured back from `now`).
    pub fn parse_history(
        symbol: &str,
        body: Value,
        period: Period,
        interval: Interval,
        now: DateTime<Utc>,
    ) -> Result<PriceSeries, CoreError> {
        let Value::Object(mut body) = body else {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Unexpected response shape for {symbol}"),
            });
        };
        Self::check_body(symbol, &body)?;

        let (_, series_key) = Self::series_endpoint(interval);
        let raw = body.remove(series_key).ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No time series data for {symbol}. API limit may be exceeded."),
        })?;
        let bars: HashMap<String, Bar> = serde_json::from_value(raw)?;

        let start = period.start_from(now);
        let points: Vec<PricePoint> = bars
            .iter()
            .filter_map(|(raw, bar)| {
                let timestamp = Self::parse_timestamp(raw)?;
                if start.is_some_and(|s| timestamp < s) {
                    return None;
                }
                let close: f64 = bar.close.parse().ok()?;
                Some(PricePoint::new(timestamp, close))
            })
            .collect();
        Ok(PriceSeries::from_unsorted(symbol, points))
    }

    /// Parse a GLOBAL_QUOTE response body into the latest price.
    pub fn parse_latest_price(symbol: &str, body: Value) -> Result<f64, CoreError> {
        let Value::Object(mut body) = body else {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Unexpected response shape for {symbol}"),
            });
        };
        Self::check_body(symbol, &body)?;

        let quote: GlobalQuote = body
            .remove("Global Quote")
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("No quote data for {symbol}. API limit may be exceeded."),
            })?;

        let price_str = quote.price.ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Quote for {symbol} has no price"),
        })?;

        price_str.trim().parse().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid price format for {symbol}: {e}"),
        })
    }

    async fn fetch_json(&self, params: &[(&str, &str)], symbol: &str) -> Result<Value, CoreError> {
        self.client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse response for {symbol}: {e}"),
            })
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct Bar {
    #[serde(rename = "4. close")]
    close: String,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
}

#[async_trait]
impl MarketDataClient for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        let (function, _) = Self::series_endpoint(interval);
        let upper = symbol.to_uppercase();
        let mut params = vec![
            ("function", function),
            ("symbol", upper.as_str()),
            ("outputsize", Self::output_size(period)),
        ];
        if interval == Interval::OneHour {
            params.push(("interval", "60min"));
        }

        let body = self.fetch_json(&params, symbol).await?;
        Self::parse_history(symbol, body, period, interval, Utc::now())
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<f64, CoreError> {
        let upper = symbol.to_uppercase();
        let body = self
            .fetch_json(&[("function", "GLOBAL_QUOTE"), ("symbol", upper.as_str())], symbol)
            .await?;
        Self::parse_latest_price(symbol, body)
    }
}
