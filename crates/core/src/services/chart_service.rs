use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::chart::{ChartData, ChartKind, ChartSeries, XAxis};
use crate::models::forecast::QuantileForecast;
use crate::models::holding::CategoryKind;
use crate::models::ledger::Ledger;
use crate::models::price::PriceSeries;

/// Generates chart-ready data sets for a `ReportRenderer`.
///
/// All numbers are computed here; the renderer only draws them.
pub struct ChartService;

impl ChartService {
    pub fn new() -> Self {
        Self
    }

    /// Line chart of close prices, one series per symbol.
    ///
    /// Series are aligned on the timestamps present in every input series,
    /// oldest first, so all series share one x-axis.
    pub fn price_history_chart(&self, series: &[PriceSeries]) -> ChartData {
        let mut common: Option<BTreeSet<DateTime<Utc>>> = None;
        for s in series {
            let stamps: BTreeSet<DateTime<Utc>> = s.points().iter().map(|p| p.timestamp).collect();
            common = Some(match common {
                Some(acc) => acc.intersection(&stamps).copied().collect(),
                None => stamps,
            });
        }
        let common = common.unwrap_or_default();

        let chart_series = series
            .iter()
            .map(|s| {
                let by_time: BTreeMap<DateTime<Utc>, f64> =
                    s.points().iter().map(|p| (p.timestamp, p.close)).collect();
                ChartSeries {
                    label: s.symbol().to_string(),
                    values: common.iter().filter_map(|t| by_time.get(t).copied()).collect(),
                }
            })
            .collect();

        let symbols: Vec<&str> = series.iter().map(|s| s.symbol()).collect();
        ChartData {
            title: format!("Price history: {}", symbols.join(", ")),
            kind: ChartKind::Line,
            x_axis: XAxis::Dates(common.iter().map(|t| t.date_naive()).collect()),
            series: chart_series,
        }
    }

    /// Pie chart of value shares grouped by sector or asset class.
    pub fn allocation_chart(&self, ledger: &Ledger, kind: CategoryKind) -> ChartData {
        let shares = ledger.value_by_category(kind);
        ChartData {
            title: format!("Allocation by {}", kind.to_string().to_lowercase()),
            kind: ChartKind::Pie,
            x_axis: XAxis::Labels(shares.keys().cloned().collect()),
            series: vec![ChartSeries {
                label: "share".into(),
                values: shares.values().copied().collect(),
            }],
        }
    }

    /// Line chart of forecast bands over time steps.
    pub fn forecast_chart(&self, forecast: &QuantileForecast) -> ChartData {
        ChartData {
            title: format!(
                "Portfolio value forecast ({} paths, {} steps)",
                forecast.paths, forecast.steps
            ),
            kind: ChartKind::Line,
            x_axis: XAxis::Steps((0..forecast.steps).map(|s| s as f64).collect()),
            series: forecast
                .bands
                .iter()
                .map(|b| ChartSeries {
                    label: b.label.clone(),
                    values: b.values.clone(),
                })
                .collect(),
        }
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
