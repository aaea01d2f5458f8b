use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::CoreError;

use super::holding::{CategoryKind, Holding};

/// The set of holdings, keyed by symbol.
///
/// Iteration is always in symbol order, so anything derived from the ledger
/// (including seeded forecasts) is reproducible.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ledger {
    holdings: BTreeMap<String, Holding>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a holding. Fails if its symbol is already present.
    pub fn insert(&mut self, holding: Holding) -> Result<(), CoreError> {
        if self.holdings.contains_key(holding.symbol()) {
            return Err(CoreError::DuplicateSymbol(holding.symbol().to_string()));
        }
        self.holdings.insert(holding.symbol().to_string(), holding);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(&symbol.trim().to_uppercase())
    }

    pub(crate) fn get_mut(&mut self, symbol: &str) -> Option<&mut Holding> {
        self.holdings.get_mut(&symbol.trim().to_uppercase())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    /// Holdings in symbol order.
    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.holdings.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Sum of current values across all holdings.
    pub fn total_value(&self) -> f64 {
        self.holdings.values().map(Holding::current_value).sum()
    }

    /// Sum of transaction (purchase) values across all holdings.
    pub fn total_transaction_value(&self) -> f64 {
        self.holdings.values().map(Holding::transaction_value).sum()
    }

    /// Share of total current value per category.
    ///
    /// Fractions sum to 1.0 for any ledger with positive total value; an
    /// empty ledger yields an empty map.
    pub fn value_by_category(&self, kind: CategoryKind) -> BTreeMap<String, f64> {
        let total = self.total_value();
        if total <= 0.0 {
            return BTreeMap::new();
        }

        let mut groups: BTreeMap<String, f64> = BTreeMap::new();
        for holding in self.holdings.values() {
            *groups.entry(holding.category(kind).to_string()).or_insert(0.0) +=
                holding.current_value();
        }
        for value in groups.values_mut() {
            *value /= total;
        }
        groups
    }
}
