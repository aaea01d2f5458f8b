use async_trait::async_trait;
use std::future::Future;

use crate::errors::CoreError;
use crate::models::price::{Interval, Period, PriceSeries};
use crate::models::settings::FetchSettings;
use crate::providers::registry::MarketDataRegistry;
use crate::providers::traits::MarketDataClient;

/// Resilient front for the registered market data providers.
///
/// Every provider call is bounded by a timeout and retried a fixed number
/// of times on transient failures (network errors, timeouts, API errors).
/// When a provider is exhausted the next one in registration order is
/// tried. Whatever finally fails is reported as `DataUnavailable` for the
/// symbol, so callers see a single error kind from this boundary.
pub struct PriceService {
    registry: MarketDataRegistry,
    policy: FetchSettings,
}

impl PriceService {
    pub fn new(registry: MarketDataRegistry, policy: FetchSettings) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> &FetchSettings {
        &self.policy
    }

    /// Names of the registered providers, in fallback order.
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Run `call` against each provider until one succeeds.
    async fn with_fallback<'a, T, F, Fut>(
        &'a self,
        symbol: &str,
        operation: &str,
        call: F,
    ) -> Result<T, CoreError>
    where
        F: Fn(&'a dyn MarketDataClient) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        if self.registry.is_empty() {
            return Err(CoreError::data_unavailable(symbol, CoreError::NoProvider));
        }

        let mut last_error = None;
        for provider in self.registry.providers() {
            match self.with_retries(provider, symbol, operation, &call).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::warn!(
                        "{} failed {operation} for {symbol}, trying next provider: {e}",
                        provider.name()
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(CoreError::data_unavailable(
            symbol,
            last_error.unwrap_or(CoreError::NoProvider),
        ))
    }

    /// Run `call` against one provider with timeout and retry policy.
    async fn with_retries<'a, T, F, Fut>(
        &self,
        provider: &'a dyn MarketDataClient,
        symbol: &str,
        operation: &str,
        call: &F,
    ) -> Result<T, CoreError>
    where
        F: Fn(&'a dyn MarketDataClient) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout(), call(provider)).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::Timeout {
                    provider: provider.name().to_string(),
                    millis: self.policy.timeout_ms,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.policy.retries => {
                    attempt += 1;
                    let wait = self.policy.backoff(attempt);
                    log::debug!(
                        "{operation} for {symbol} via {} failed ({e}); retry {attempt}/{} in {}ms",
                        provider.name(),
                        self.policy.retries,
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MarketDataClient for PriceService {
    fn name(&self) -> &str {
        "PriceService"
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, CoreError> {
        self.with_fallback(symbol, "history", |provider| {
            provider.get_history(symbol, period, interval)
        })
        .await
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<f64, CoreError> {
        self.with_fallback(symbol, "latest price", |provider| async move {
            let price = provider.get_latest_price(symbol).await?;
            // A provider that answers with garbage is as good as one that failed.
            if !price.is_finite() || price <= 0.0 {
                return Err(CoreError::Api {
                    provider: provider.name().to_string(),
                    message: format!(
                        "Invalid price returned for {symbol}: {price} (must be finite and positive)"
                    ),
                });
            }
            Ok(price)
        })
        .await
    }
}
