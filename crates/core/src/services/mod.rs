pub mod analytics_service;
pub mod chart_service;
pub mod forecast_service;
pub mod gbm_simulator;
pub mod ledger_service;
pub mod price_service;
pub mod return_estimator;
