// Metric and view domain model
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensor measurement tracked per plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Temperature,
    Humidity,
    Moisture,
    Ph,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Moisture,
        MetricKind::Ph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Humidity => "humidity",
            MetricKind::Moisture => "moisture",
            MetricKind::Ph => "ph",
        }
    }

    /// Field carrying this metric in realtime-analysis records.
    pub fn filtered_key(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "filt_temperature",
            MetricKind::Humidity => "filt_humidity",
            MetricKind::Moisture => "filt_moisture",
            MetricKind::Ph => "filt_ph",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "hsl(10, 70%, 50%)",
            MetricKind::Humidity => "hsl(200, 70%, 50%)",
            MetricKind::Moisture => "hsl(90, 70%, 50%)",
            MetricKind::Ph => "hsl(320, 70%, 50%)",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

/// Backend view selecting endpoint and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Raw,
    Historical,
    Realtime,
}

/// What one chart shows. Only raw charts are bound to a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartView {
    Raw(MetricKind),
    Historical,
    Realtime,
}

impl ChartView {
    pub fn new(view: View, metric: MetricKind) -> Self {
        match view {
            View::Raw => ChartView::Raw(metric),
            View::Historical => ChartView::Historical,
            View::Realtime => ChartView::Realtime,
        }
    }

    pub fn view(&self) -> View {
        match self {
            ChartView::Raw(_) => View::Raw,
            ChartView::Historical => View::Historical,
            ChartView::Realtime => View::Realtime,
        }
    }

    /// Label used for "no data" messages.
    pub fn label(&self) -> &'static str {
        match self {
            ChartView::Raw(metric) => metric.as_str(),
            ChartView::Historical => "historical",
            ChartView::Realtime => "realtime",
        }
    }
}
