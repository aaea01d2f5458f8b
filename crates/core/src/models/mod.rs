pub mod analytics;
pub mod chart;
pub mod forecast;
pub mod holding;
pub mod ledger;
pub mod price;
pub mod settings;
