use futures::stream::{self, StreamExt, TryStreamExt};

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::ledger::Ledger;
use crate::providers::traits::MarketDataClient;

/// Adds holdings to a ledger and keeps their prices current.
///
/// The only I/O is the latest-price lookup through the supplied
/// `MarketDataClient`; valuation and grouping live on `Ledger` itself.
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Add a new holding priced at the client's latest close.
    ///
    /// Fails with `DuplicateSymbol` before any lookup if the symbol is
    /// already held, and with `DataUnavailable` if the lookup fails. The
    /// ledger is untouched on every failure path.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_holding(
        &self,
        ledger: &mut Ledger,
        client: &dyn MarketDataClient,
        symbol: &str,
        sector: &str,
        asset_class: &str,
        quantity: f64,
        purchase_price: f64,
    ) -> Result<(), CoreError> {
        let symbol = symbol.trim().to_uppercase();
        if ledger.contains(&symbol) {
            return Err(CoreError::DuplicateSymbol(symbol));
        }

        let latest_price = client
            .get_latest_price(&symbol)
            .await
            .and_then(|price| usable_price(&symbol, price))
            .map_err(|e| CoreError::data_unavailable(&symbol, e))?;

        let holding = Holding::new(
            &symbol,
            sector,
            asset_class,
            quantity,
            purchase_price,
            latest_price,
        )?;
        ledger.insert(holding)?;

        log::info!("Added {quantity} × {symbol} @ {purchase_price} (latest {latest_price})");
        Ok(())
    }

    /// Refetch the latest price of every holding.
    ///
    /// Lookups run concurrently, at most `max_concurrent` at a time. Prices
    /// are only written once every lookup has succeeded, so a failure leaves
    /// all holdings at their previous prices.
    pub async fn refresh_prices(
        &self,
        ledger: &mut Ledger,
        client: &dyn MarketDataClient,
        max_concurrent: usize,
    ) -> Result<(), CoreError> {
        let symbols: Vec<String> = ledger.symbols().into_iter().map(String::from).collect();

        let prices: Vec<(String, f64)> = stream::iter(symbols)
            .map(|symbol| async move {
                let price = client
                    .get_latest_price(&symbol)
                    .await
                    .and_then(|price| usable_price(&symbol, price))
                    .map_err(|e| CoreError::data_unavailable(&symbol, e))?;
                Ok::<_, CoreError>((symbol, price))
            })
            .buffered(max_concurrent.max(1))
            .try_collect()
            .await?;

        // Validate everything before mutating anything.
        let mut staged = ledger.clone();
        for (symbol, price) in &prices {
            staged
                .get_mut(symbol)
                .ok_or_else(|| CoreError::HoldingNotFound(symbol.clone()))?
                .refresh_price(*price)?;
        }
        *ledger = staged;

        log::debug!("Refreshed prices for {} holdings", prices.len());
        Ok(())
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}

/// A quote is only usable if it is finite and positive.
fn usable_price(symbol: &str, price: f64) -> Result<f64, CoreError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(CoreError::InvalidPriceSeries {
            symbol: symbol.to_string(),
            reason: format!("latest price {price} is not positive"),
        })
    }
}
