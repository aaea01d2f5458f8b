use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

/// A single close-price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }

    /// Close observed at midnight UTC of `date` (daily bars).
    pub fn on_date(date: NaiveDate, close: f64) -> Self {
        let timestamp = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
        Self { timestamp, close }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Direction in which a `PriceSeries` is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesOrder {
    OldestFirst,
    NewestFirst,
}

/// Close prices for one symbol, strictly ordered by time in one direction.
///
/// Construction validates the ordering, rejects duplicate timestamps and
/// requires every close to be finite and positive. Consumers must not assume
/// which direction a series runs in: use [`PriceSeries::chronological_closes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points that are already ordered (either direction).
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, CoreError> {
        let symbol = symbol.into().to_uppercase();

        if let Some(bad) = points.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
            return Err(CoreError::InvalidPriceSeries {
                symbol,
                reason: format!("close {} at {} is not a positive price", bad.close, bad.timestamp),
            });
        }

        if points.len() >= 2 {
            let ascending = points[0].timestamp < points[1].timestamp;
            let consistent = points.windows(2).all(|w| {
                if ascending {
                    w[0].timestamp < w[1].timestamp
                } else {
                    w[0].timestamp > w[1].timestamp
                }
            });
            if !consistent {
                return Err(CoreError::InvalidPriceSeries {
                    symbol,
                    reason: "timestamps are not strictly ordered or contain duplicates".into(),
                });
            }
        }

        Ok(Self { symbol, points })
    }

    /// Normalize raw provider output: drop unusable closes, sort oldest-first
    /// and keep the last observation for any repeated timestamp.
    pub fn from_unsorted(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite() && p.close > 0.0);
        // Stable sort keeps provider order among equal timestamps.
        points.sort_by_key(|p| p.timestamp);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.timestamp == point.timestamp => *last = point,
                _ => deduped.push(point),
            }
        }

        Self {
            symbol: symbol.into().to_uppercase(),
            points: deduped,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Direction of the series; `None` when it has fewer than two points.
    pub fn order(&self) -> Option<SeriesOrder> {
        match self.points.as_slice() {
            [first, second, ..] if first.timestamp < second.timestamp => {
                Some(SeriesOrder::OldestFirst)
            }
            [_, _, ..] => Some(SeriesOrder::NewestFirst),
            _ => None,
        }
    }

    /// Points oldest-first regardless of the stored direction.
    pub fn chronological(&self) -> Vec<PricePoint> {
        let mut points = self.points.clone();
        if self.order() == Some(SeriesOrder::NewestFirst) {
            points.reverse();
        }
        points
    }

    /// Closes oldest-first regardless of the stored direction.
    pub fn chronological_closes(&self) -> Vec<f64> {
        self.chronological().into_iter().map(|p| p.close).collect()
    }

    /// Most recent observation.
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.iter().max_by_key(|p| p.timestamp)
    }
}

/// How far back a history request reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// Earliest timestamp covered by this period, measured back from `now`.
    /// `None` means unbounded (`max`).
    pub fn start_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Period::OneDay => 1,
            Period::FiveDays => 5,
            Period::OneMonth => 31,
            Period::ThreeMonths => 92,
            Period::SixMonths => 183,
            Period::OneYear => 366,
            Period::TwoYears => 731,
            Period::FiveYears => 1827,
            Period::TenYears => 3653,
            Period::YearToDate => {
                let jan_first = NaiveDate::from_ymd_opt(now.year(), 1, 1)?;
                return Some(Utc.from_utc_datetime(&jan_first.and_time(chrono::NaiveTime::MIN)));
            }
            Period::Max => return None,
        };
        Some(now - Duration::days(days))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::Configuration(format!("Unknown history period: {s}")))
    }
}

/// Bar size of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
}

impl Interval {
    pub const ALL: [Interval; 4] = [
        Interval::OneHour,
        Interval::OneDay,
        Interval::OneWeek,
        Interval::OneMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| CoreError::Configuration(format!("Unknown history interval: {s}")))
    }
}
