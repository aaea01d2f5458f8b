use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Which categorical attribute of a holding to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    Sector,
    AssetClass,
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryKind::Sector => write!(f, "Sector"),
            CategoryKind::AssetClass => write!(f, "Asset class"),
        }
    }
}

/// A position in one symbol.
///
/// Quantity and purchase price are fixed at construction; only the latest
/// observed price (and therefore the current value) changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    symbol: String,
    sector: String,
    asset_class: String,
    quantity: f64,
    purchase_price: f64,
    latest_price: f64,
}

impl Holding {
    /// Validated constructor. The symbol is uppercased.
    pub fn new(
        symbol: impl Into<String>,
        sector: impl Into<String>,
        asset_class: impl Into<String>,
        quantity: f64,
        purchase_price: f64,
        latest_price: f64,
    ) -> Result<Self, CoreError> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CoreError::ValidationError("Holding symbol must not be empty".into()));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Quantity for {symbol} must be positive, got {quantity}"
            )));
        }
        if !purchase_price.is_finite() || purchase_price <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Purchase price for {symbol} must be positive, got {purchase_price}"
            )));
        }
        Self::check_price(&symbol, latest_price)?;

        Ok(Self {
            symbol,
            sector: sector.into(),
            asset_class: asset_class.into(),
            quantity,
            purchase_price,
            latest_price,
        })
    }

    fn check_price(symbol: &str, price: f64) -> Result<(), CoreError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Latest price for {symbol} must be positive, got {price}"
            )));
        }
        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn sector(&self) -> &str {
        &self.sector
    }

    pub fn asset_class(&self) -> &str {
        &self.asset_class
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn purchase_price(&self) -> f64 {
        self.purchase_price
    }

    pub fn latest_price(&self) -> f64 {
        self.latest_price
    }

    /// quantity × purchase price
    pub fn transaction_value(&self) -> f64 {
        self.quantity * self.purchase_price
    }

    /// quantity × latest observed price
    pub fn current_value(&self) -> f64 {
        self.quantity * self.latest_price
    }

    pub fn gain_loss(&self) -> f64 {
        self.current_value() - self.transaction_value()
    }

    /// Percentage return on the purchase, e.g. `12.5` for +12.5%.
    pub fn return_pct(&self) -> f64 {
        (self.gain_loss() / self.transaction_value()) * 100.0
    }

    pub fn category(&self, kind: CategoryKind) -> &str {
        match kind {
            CategoryKind::Sector => &self.sector,
            CategoryKind::AssetClass => &self.asset_class,
        }
    }

    /// Record a freshly observed price.
    pub fn refresh_price(&mut self, latest_price: f64) -> Result<(), CoreError> {
        Self::check_price(&self.symbol, latest_price)?;
        self.latest_price = latest_price;
        Ok(())
    }
}
