use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of chart a renderer should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Pie,
}

/// Values along the x-axis of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum XAxis {
    Dates(Vec<NaiveDate>),
    Steps(Vec<f64>),
    Labels(Vec<String>),
}

impl XAxis {
    pub fn len(&self) -> usize {
        match self {
            XAxis::Dates(v) => v.len(),
            XAxis::Steps(v) => v.len(),
            XAxis::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One named numeric series; aligned index-by-index with the x-axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// A chart-ready data set.
///
/// Values are final; renderers draw them without further computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub title: String,
    pub kind: ChartKind,
    pub x_axis: XAxis,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn series(&self, label: &str) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.label == label)
    }
}
