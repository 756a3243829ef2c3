// Telemetry data domain models
use super::metric::MetricKind;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub id: MetricKind,
    pub data: Vec<Sample>,
}

impl Series {
    /// Builds a series ordered by timestamp. Samples sharing a timestamp keep
    /// their arrival order.
    pub fn new(id: MetricKind, mut data: Vec<Sample>) -> Self {
        data.sort_by_key(|s| s.timestamp);
        Self { id, data }
    }

    pub fn color(&self) -> &'static str {
        self.id.color()
    }
}

/// Render-ready output of one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResult {
    pub series: Vec<Series>,
    pub is_empty: bool,
}

impl ViewResult {
    /// Drops series without samples and derives `is_empty` from what is left.
    pub fn from_series(series: Vec<Series>) -> Self {
        let series: Vec<Series> = series.into_iter().filter(|s| !s.data.is_empty()).collect();
        let is_empty = series.is_empty();
        Self { series, is_empty }
    }

    pub fn empty() -> Self {
        Self {
            series: Vec::new(),
            is_empty: true,
        }
    }

    pub fn series(&self, id: MetricKind) -> Option<&Series> {
        self.series.iter().find(|s| s.id == id)
    }

    pub fn sample_count(&self) -> usize {
        self.series.iter().map(|s| s.data.len()).sum()
    }
}

/// Latest water tank reading for a plant.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TankStatus {
    pub level: Option<f64>,
    pub measured_at: Option<DateTime<Utc>>,
}

impl TankStatus {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.level.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationReceipt {
    pub percentage_used: Option<f64>,
}

/// Parses backend timestamps. Stamps without an offset are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Rounds to two decimals; `None` when the input or result is not finite.
pub fn round_value(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = (value * 100.0).round() / 100.0;
    rounded.is_finite().then_some(rounded)
}
