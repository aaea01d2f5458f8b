use crate::models::analytics::{HoldingSummary, PortfolioSummary};
use crate::models::ledger::Ledger;

/// Computes ledger analytics: gain/loss, returns, allocation breakdown.
///
/// Works from the prices already recorded on each holding; call
/// `LedgerService::refresh_prices` first for an up-to-date picture.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    pub fn summarize(&self, ledger: &Ledger) -> PortfolioSummary {
        let total_value = ledger.total_value();
        let total_invested = ledger.total_transaction_value();

        let mut holdings: Vec<HoldingSummary> = ledger
            .holdings()
            .map(|h| HoldingSummary {
                symbol: h.symbol().to_string(),
                sector: h.sector().to_string(),
                asset_class: h.asset_class().to_string(),
                quantity: h.quantity(),
                purchase_price: h.purchase_price(),
                latest_price: h.latest_price(),
                transaction_value: h.transaction_value(),
                current_value: h.current_value(),
                gain_loss: h.gain_loss(),
                return_pct: h.return_pct(),
                allocation_pct: if total_value > 0.0 {
                    (h.current_value() / total_value) * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        // Largest allocation first; ties keep symbol order.
        holdings.sort_by(|a, b| b.allocation_pct.total_cmp(&a.allocation_pct));

        let total_gain_loss = total_value - total_invested;
        let total_return_pct = if total_invested > 0.0 {
            (total_gain_loss / total_invested) * 100.0
        } else {
            0.0
        };

        PortfolioSummary {
            total_holdings: ledger.len(),
            total_invested,
            total_value,
            total_gain_loss,
            total_return_pct,
            holdings,
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
