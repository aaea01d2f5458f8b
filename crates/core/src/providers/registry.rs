use std::collections::HashMap;

use super::alphavantage::AlphaVantageProvider;
use super::traits::MarketDataClient;
use super::yahoo_finance::YahooFinanceProvider;

/// Ordered collection of market data providers.
///
/// Registration order is priority order: `PriceService` tries the first
/// provider and falls back to the next one on failure.
pub struct MarketDataRegistry {
    providers: Vec<Box<dyn MarketDataClient>>,
}

impl MarketDataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance: no API key needed, primary
        match YahooFinanceProvider::new() {
            Ok(yahoo) => registry.register(Box::new(yahoo)),
            Err(e) => log::warn!("Yahoo Finance provider unavailable: {e}"),
        }

        // Alpha Vantage: API key required, fallback
        if let Some(key) = api_keys.get("alphavantage") {
            registry.register(Box::new(AlphaVantageProvider::new(key.clone())));
        }

        registry
    }

    /// Register a provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn MarketDataClient>) {
        self.providers.push(provider);
    }

    /// All providers, highest priority first.
    pub fn providers(&self) -> impl Iterator<Item = &dyn MarketDataClient> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for MarketDataRegistry {
    fn default() -> Self {
        Self::new()
    }
}
