// ═══════════════════════════════════════════════════════════════════
// Service Tests — ReturnEstimator, GbmSimulator, LedgerService,
// AnalyticsService, ChartService, JsonRenderer
// ═══════════════════════════════════════════════════════════════════

mod common;

use chrono::{Duration, NaiveDate};
use rand::rngs::mock::StepRng;

use common::{
    daily_series, daily_series_newest_first, FailingClient, FixedPriceClient, MockClient,
};
use portfolio_forecast_core::errors::CoreError;
use portfolio_forecast_core::models::chart::{ChartData, ChartKind, XAxis};
use portfolio_forecast_core::models::forecast::{
    AggregationMode, QuantileBand, QuantileForecast,
};
use portfolio_forecast_core::models::holding::{CategoryKind, Holding};
use portfolio_forecast_core::models::ledger::Ledger;
use portfolio_forecast_core::models::price::{PricePoint, PriceSeries};
use portfolio_forecast_core::renderers::json::JsonRenderer;
use portfolio_forecast_core::renderers::traits::ReportRenderer;
use portfolio_forecast_core::services::analytics_service::AnalyticsService;
use portfolio_forecast_core::services::chart_service::ChartService;
use portfolio_forecast_core::services::gbm_simulator::GbmSimulator;
use portfolio_forecast_core::services::ledger_service::LedgerService;
use portfolio_forecast_core::services::return_estimator::ReturnEstimator;

fn sample_ledger() -> Ledger {
    let mut ledger = Ledger::new();
    ledger
        .insert(Holding::new("AAPL", "Technology", "Equity", 10.0, 100.0, 150.0).unwrap())
        .unwrap();
    ledger
        .insert(Holding::new("TLT", "Government", "Bond", 5.0, 300.0, 280.0).unwrap())
        .unwrap();
    ledger
}

// ═══════════════════════════════════════════════════════════════════
// ReturnEstimator
// ═══════════════════════════════════════════════════════════════════

mod return_estimator {
    use super::*;

    #[test]
    fn simple_returns_are_chronological() {
        let est = ReturnEstimator::new();
        let s = daily_series("X", &[100.0, 110.0, 99.0]);
        let r = est.simple_returns(&s);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn direction_does_not_change_the_estimate() {
        let est = ReturnEstimator::new();
        let closes = [100.0, 102.0, 101.0, 105.0, 103.5];
        let a = est.estimate(&daily_series("X", &closes)).unwrap();
        let b = est.estimate(&daily_series_newest_first("X", &closes)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sample_mean_and_std() {
        let est = ReturnEstimator::new();
        // Returns: +10%, -10%
        let stats = est.estimate(&daily_series("X", &[100.0, 110.0, 99.0])).unwrap();
        assert!(stats.drift.abs() < 1e-12);
        // Sample std of [0.1, -0.1] with n − 1 = 1: sqrt(0.02) ≈ 0.141421
        assert!((stats.volatility - 0.02f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.observations, 2);
        assert_eq!(stats.symbol, "X");
    }

    #[test]
    fn constant_prices_have_zero_drift_and_volatility() {
        let est = ReturnEstimator::new();
        let stats = est.estimate(&daily_series("X", &[50.0; 5])).unwrap();
        assert_eq!(stats.drift, 0.0);
        assert_eq!(stats.volatility, 0.0);
    }

    #[test]
    fn two_points_give_zero_volatility() {
        let est = ReturnEstimator::new();
        let stats = est.estimate(&daily_series("X", &[100.0, 105.0])).unwrap();
        assert!((stats.drift - 0.05).abs() < 1e-12);
        assert_eq!(stats.volatility, 0.0);
        assert_eq!(stats.observations, 1);
    }

    #[test]
    fn fewer_than_two_points_is_insufficient() {
        let est = ReturnEstimator::new();
        let one = PriceSeries::new(
            "X",
            vec![PricePoint::on_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0)],
        )
        .unwrap();
        assert!(matches!(
            est.estimate(&one),
            Err(CoreError::InsufficientData { points: 1, .. })
        ));
        let empty = PriceSeries::new("X", vec![]).unwrap();
        assert!(matches!(
            est.estimate(&empty),
            Err(CoreError::InsufficientData { points: 0, .. })
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// GbmSimulator
// ═══════════════════════════════════════════════════════════════════

mod gbm_simulator {
    use super::*;

    #[test]
    fn step_zero_is_the_initial_price() {
        let mut sim = GbmSimulator::seeded(7);
        let m = sim.simulate_paths(123.0, 50, 20, 0.001, 0.02).unwrap();
        assert_eq!(m.paths(), 50);
        assert_eq!(m.steps(), 20);
        assert!(m.step(0).iter().all(|&v| v == 123.0));
    }

    #[test]
    fn zero_drift_zero_volatility_is_flat() {
        let mut sim = GbmSimulator::seeded(1);
        let m = sim.simulate_paths(100.0, 10, 3, 0.0, 0.0).unwrap();
        for p in 0..10 {
            assert_eq!(m.path(p), vec![100.0, 100.0, 100.0]);
        }
    }

    #[test]
    fn zero_volatility_grows_deterministically() {
        let mut sim = GbmSimulator::seeded(1);
        let m = sim.simulate_paths(100.0, 4, 3, 0.01, 0.0).unwrap();
        let g = 0.01f64.exp();
        for p in 0..4 {
            assert!((m.get(p, 1) - 100.0 * g).abs() < 1e-9);
            assert!((m.get(p, 2) - 100.0 * g * g).abs() < 1e-9);
        }
    }

    #[test]
    fn paths_stay_positive() {
        let mut sim = GbmSimulator::seeded(99);
        let m = sim.simulate_paths(1.0, 200, 100, -0.01, 0.5).unwrap();
        for s in 0..m.steps() {
            assert!(m.step(s).iter().all(|&v| v > 0.0 && v.is_finite()));
        }
    }

    #[test]
    fn same_seed_same_paths() {
        let a = GbmSimulator::seeded(42)
            .simulate_paths(10.0, 20, 30, 0.0005, 0.02)
            .unwrap();
        let b = GbmSimulator::seeded(42)
            .simulate_paths(10.0, 20, 30, 0.0005, 0.02)
            .unwrap();
        let c = GbmSimulator::seeded(43)
            .simulate_paths(10.0, 20, 30, 0.0005, 0.02)
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn simulate_step_advances_every_path() {
        let mut sim = GbmSimulator::new(StepRng::new(0, 1));
        let next = sim.simulate_step(&[1.0, 2.0, 3.0], 1.0, 0.0, 0.0).unwrap();
        assert_eq!(next, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn zero_volatility_step_is_exact_exponential() {
        let mut sim = GbmSimulator::seeded(8);
        let current = [50.0, 75.5, 101.25];
        let next = sim.simulate_step(&current, 0.5, 0.02, 0.0).unwrap();
        for (n, c) in next.iter().zip(current) {
            assert_eq!(*n, c * (0.02f64 * 0.5).exp());
        }
    }

    #[test]
    fn uneven_timeline_scales_drift() {
        let mut sim = GbmSimulator::seeded(3);
        let m = sim
            .simulate_on_timeline(100.0, 2, &[0.0, 0.5, 2.5], 0.1, 0.0)
            .unwrap();
        assert!((m.get(0, 1) - 100.0 * (0.05f64).exp()).abs() < 1e-9);
        assert!((m.get(1, 2) - 100.0 * (0.25f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut sim = GbmSimulator::seeded(0);
        let bad = [
            sim.simulate_paths(100.0, 0, 10, 0.0, 0.1).map(|_| ()),
            sim.simulate_paths(100.0, 10, 0, 0.0, 0.1).map(|_| ()),
            sim.simulate_paths(0.0, 10, 10, 0.0, 0.1).map(|_| ()),
            sim.simulate_paths(100.0, 10, 10, f64::NAN, 0.1).map(|_| ()),
            sim.simulate_paths(100.0, 10, 10, 0.0, -0.1).map(|_| ()),
            sim.simulate_on_timeline(100.0, 10, &[0.0, 1.0, 1.0], 0.0, 0.1).map(|_| ()),
            sim.simulate_step(&[1.0], -1.0, 0.0, 0.1).map(|_| ()),
        ];
        for (i, r) in bad.into_iter().enumerate() {
            assert!(matches!(r, Err(CoreError::Configuration(_))), "case {i}");
        }
    }

    #[test]
    fn single_step_is_just_the_seed() {
        let mut sim = GbmSimulator::seeded(5);
        let m = sim.simulate_paths(80.0, 3, 1, 0.1, 0.3).unwrap();
        assert_eq!(m.path(2), vec![80.0]);
    }

    #[test]
    fn quantile_bands_are_ordered() {
        let mut sim = GbmSimulator::seeded(11);
        let m = sim.simulate_paths(100.0, 500, 50, 0.0, 0.03).unwrap();
        let bands = m.quantile_bands(&[0.05, 0.5, 0.95]);
        for s in 0..50 {
            assert!(bands[0][s] <= bands[1][s]);
            assert!(bands[1][s] <= bands[2][s]);
        }
        assert!(bands.iter().all(|b| b[0] == 100.0));
    }

    #[test]
    fn scale_and_accumulate() {
        let mut a = GbmSimulator::seeded(1).simulate_paths(2.0, 3, 2, 0.0, 0.0).unwrap();
        let b = GbmSimulator::seeded(2).simulate_paths(5.0, 3, 2, 0.0, 0.0).unwrap();
        a.scale(10.0);
        a.accumulate(&b).unwrap();
        assert_eq!(a.path(0), vec![25.0, 25.0]);

        let wrong = GbmSimulator::seeded(2).simulate_paths(5.0, 4, 2, 0.0, 0.0).unwrap();
        assert!(a.accumulate(&wrong).is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// LedgerService
// ═══════════════════════════════════════════════════════════════════

mod ledger_service {
    use super::*;

    #[tokio::test]
    async fn add_holding_prices_from_client() {
        let client = MockClient::new().with_price("AAPL", 150.0);
        let svc = LedgerService::new();
        let mut ledger = Ledger::new();

        svc.add_holding(&mut ledger, &client, "aapl", "Technology", "Equity", 10.0, 120.0)
            .await
            .unwrap();

        let h = ledger.get("AAPL").unwrap();
        assert_eq!(h.latest_price(), 150.0);
        assert_eq!(h.current_value(), 1500.0);
        assert_eq!(h.transaction_value(), 1200.0);
        assert_eq!(ledger.total_value(), 1500.0);
    }

    #[tokio::test]
    async fn second_holding_updates_totals() {
        let client = MockClient::new()
            .with_price("AAPL", 150.0)
            .with_price("TLT", 280.0);
        let svc = LedgerService::new();
        let mut ledger = Ledger::new();
        svc.add_holding(&mut ledger, &client, "AAPL", "Technology", "Equity", 10.0, 150.0)
            .await
            .unwrap();
        svc.add_holding(&mut ledger, &client, "TLT", "Government", "Bond", 5.0, 280.0)
            .await
            .unwrap();

        assert_eq!(ledger.total_value(), 2900.0);
        let by_class = ledger.value_by_category(CategoryKind::AssetClass);
        assert!((by_class["Equity"] - 0.5172).abs() < 1e-4);
    }

    #[tokio::test]
    async fn failed_lookup_leaves_ledger_unchanged() {
        let svc = LedgerService::new();
        let mut ledger = sample_ledger();
        let before = ledger.clone();

        let err = svc
            .add_holding(&mut ledger, &FailingClient::new(), "MSFT", "Tech", "Equity", 1.0, 1.0)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::DataUnavailable { ref symbol, .. } if symbol == "MSFT"));
        assert_eq!(ledger.symbols(), before.symbols());
        assert_eq!(ledger.total_value(), before.total_value());
    }

    #[tokio::test]
    async fn duplicate_fails_before_lookup() {
        let client = MockClient::new().with_price("AAPL", 1.0);
        let svc = LedgerService::new();
        let mut ledger = sample_ledger();

        let err = svc
            .add_holding(&mut ledger, &client, "AAPL", "x", "y", 1.0, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateSymbol(_)));
        assert_eq!(client.call_count(), 0);
        assert_eq!(ledger.get("AAPL").unwrap().quantity(), 10.0);
    }

    #[tokio::test]
    async fn invalid_quantity_is_rejected() {
        let client = MockClient::new().with_price("X", 1.0);
        let svc = LedgerService::new();
        let mut ledger = Ledger::new();
        let err = svc
            .add_holding(&mut ledger, &client, "X", "s", "a", -5.0, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn refresh_updates_every_price() {
        let client = MockClient::new()
            .with_price("AAPL", 160.0)
            .with_price("TLT", 290.0);
        let svc = LedgerService::new();
        let mut ledger = sample_ledger();

        svc.refresh_prices(&mut ledger, &client, 2).await.unwrap();
        assert_eq!(ledger.get("AAPL").unwrap().latest_price(), 160.0);
        assert_eq!(ledger.get("TLT").unwrap().latest_price(), 290.0);
    }

    #[tokio::test]
    async fn refresh_is_all_or_nothing() {
        // TLT is unknown to the client, so the whole refresh fails.
        let client = MockClient::new().with_price("AAPL", 999.0);
        let svc = LedgerService::new();
        let mut ledger = sample_ledger();

        let err = svc.refresh_prices(&mut ledger, &client, 1).await.unwrap_err();
        assert_eq!(err.symbol(), Some("TLT"));
        assert_eq!(ledger.get("AAPL").unwrap().latest_price(), 150.0);
    }

    #[tokio::test]
    async fn unusable_quote_is_data_unavailable() {
        let svc = LedgerService::new();
        for price in [0.0, -3.0, f64::NAN] {
            let mut ledger = sample_ledger();
            let err = svc
                .add_holding(&mut ledger, &FixedPriceClient(price), "MSFT", "Tech", "Equity", 1.0, 1.0)
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::DataUnavailable { ref symbol, .. } if symbol == "MSFT"));
            assert_eq!(ledger.len(), 2);
        }
    }

    #[tokio::test]
    async fn refresh_with_unusable_quote_keeps_prices() {
        let svc = LedgerService::new();
        let mut ledger = sample_ledger();
        let err = svc
            .refresh_prices(&mut ledger, &FixedPriceClient(0.0), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DataUnavailable { .. }));
        assert_eq!(ledger.get("AAPL").unwrap().latest_price(), 150.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// AnalyticsService
// ═══════════════════════════════════════════════════════════════════

mod analytics_service {
    use super::*;

    #[test]
    fn summary_totals() {
        let s = AnalyticsService::new().summarize(&sample_ledger());
        assert_eq!(s.total_holdings, 2);
        assert_eq!(s.total_invested, 2500.0);
        assert_eq!(s.total_value, 2900.0);
        assert_eq!(s.total_gain_loss, 400.0);
        assert!((s.total_return_pct - 16.0).abs() < 1e-12);
    }

    #[test]
    fn holdings_sorted_by_allocation() {
        let s = AnalyticsService::new().summarize(&sample_ledger());
        assert_eq!(s.holdings[0].symbol, "AAPL");
        assert!((s.holdings[0].allocation_pct - 1500.0 / 29.0).abs() < 1e-9);
        assert_eq!(s.holdings[1].gain_loss, -100.0);
        let total: f64 = s.holdings.iter().map(|h| h.allocation_pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_ledger() {
        let s = AnalyticsService::new().summarize(&Ledger::new());
        assert_eq!(s.total_holdings, 0);
        assert_eq!(s.total_value, 0.0);
        assert_eq!(s.total_return_pct, 0.0);
        assert!(s.holdings.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// ChartService
// ═══════════════════════════════════════════════════════════════════

mod chart_service {
    use super::*;

    #[test]
    fn price_history_aligns_on_common_dates() {
        let a = daily_series("A", &[1.0, 2.0, 3.0]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let b = PriceSeries::new(
            "B",
            vec![
                PricePoint::on_date(start + Duration::days(2), 30.0),
                PricePoint::on_date(start + Duration::days(1), 20.0),
                PricePoint::on_date(start, 10.0),
            ],
        )
        .unwrap();

        let chart = ChartService::new().price_history_chart(&[a, b]);
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.x_axis.len(), 2);
        assert_eq!(chart.series("A").unwrap().values, vec![2.0, 3.0]);
        assert_eq!(chart.series("B").unwrap().values, vec![10.0, 20.0]);
        match &chart.x_axis {
            XAxis::Dates(d) => assert_eq!(d[0], start),
            other => panic!("expected dates, got {other:?}"),
        }
    }

    #[test]
    fn allocation_chart_shares() {
        let chart = ChartService::new().allocation_chart(&sample_ledger(), CategoryKind::Sector);
        assert_eq!(chart.kind, ChartKind::Pie);
        assert_eq!(chart.title, "Allocation by sector");
        assert_eq!(
            chart.x_axis,
            XAxis::Labels(vec!["Government".into(), "Technology".into()])
        );
        let sum: f64 = chart.series("share").unwrap().values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn forecast_chart_has_one_series_per_band() {
        let forecast = QuantileForecast {
            paths: 10,
            steps: 3,
            aggregation: AggregationMode::PerAssetQuantiles,
            bands: vec![
                QuantileBand { level: 0.05, label: "5%".into(), values: vec![1.0, 0.9, 0.8] },
                QuantileBand { level: 0.95, label: "95%".into(), values: vec![1.0, 1.1, 1.2] },
            ],
            assets: vec![],
        };
        let chart = ChartService::new().forecast_chart(&forecast);
        assert_eq!(chart.x_axis, XAxis::Steps(vec![0.0, 1.0, 2.0]));
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series("95%").unwrap().values, vec![1.0, 1.1, 1.2]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// JsonRenderer
// ═══════════════════════════════════════════════════════════════════

mod json_renderer {
    use super::*;

    #[test]
    fn writes_one_line_per_chart() {
        let renderer = JsonRenderer::new(Vec::new());
        let chart = ChartService::new().allocation_chart(&sample_ledger(), CategoryKind::AssetClass);
        renderer.render(&chart).unwrap();
        renderer.render(&chart).unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: ChartData = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back.title, chart.title);
        assert_eq!(back.kind, ChartKind::Pie);
        assert_eq!(back.x_axis, chart.x_axis);
        let shares = &back.series("share").unwrap().values;
        assert!((shares.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn usable_as_trait_object() {
        let renderer: Box<dyn ReportRenderer> = Box::new(JsonRenderer::new(std::io::sink()));
        let chart = ChartService::new().allocation_chart(&Ledger::new(), CategoryKind::Sector);
        assert!(renderer.render(&chart).is_ok());
    }
}
