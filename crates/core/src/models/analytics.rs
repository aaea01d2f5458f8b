use serde::{Deserialize, Serialize};

/// Summary of the entire ledger at its latest prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Number of holdings in the ledger
    pub total_holdings: usize,

    /// Sum of quantity × purchase price
    pub total_invested: f64,

    /// Sum of quantity × latest price
    pub total_value: f64,

    /// total_value - total_invested
    pub total_gain_loss: f64,

    /// (total_gain_loss / total_invested) * 100
    pub total_return_pct: f64,

    /// Per-holding breakdown, largest allocation first
    pub holdings: Vec<HoldingSummary>,
}

/// Summary of a single holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub symbol: String,
    pub sector: String,
    pub asset_class: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub latest_price: f64,
    pub transaction_value: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub return_pct: f64,

    /// This holding's value / total portfolio value × 100
    pub allocation_pct: f64,
}
