//! Series normalization.
//!
//! Turns the three backend response shapes into a [`ViewResult`]. Every
//! function here is total: anything that does not look like the expected
//! shape is skipped record by record, and a body that is wrong as a whole
//! yields an empty result.
use crate::domain::metric::{ChartView, MetricKind};
use crate::domain::telemetry::{parse_timestamp, round_value, Sample, Series, ViewResult};
use serde_json::{Map, Value};

pub fn normalize(view: ChartView, body: &Value) -> ViewResult {
    match view {
        ChartView::Raw(metric) => normalize_raw(metric, body),
        ChartView::Historical => normalize_historical(body),
        ChartView::Realtime => normalize_realtime(body),
    }
}

/// `{timestamps: [..], values: [..]}` for a single metric.
pub fn normalize_raw(metric: MetricKind, body: &Value) -> ViewResult {
    let timestamps = body.get("timestamps").and_then(Value::as_array);
    let values = body.get("values").and_then(Value::as_array);

    let data = match (timestamps, values) {
        (Some(timestamps), Some(values)) => {
            if timestamps.len() != values.len() {
                tracing::debug!(
                    "raw {} response has {} timestamps but {} values",
                    metric,
                    timestamps.len(),
                    values.len()
                );
            }
            timestamps
                .iter()
                .zip(values)
                .filter_map(|(time, value)| sample(time, value))
                .collect()
        }
        _ => {
            tracing::debug!("raw {} response is missing timestamps or values", metric);
            Vec::new()
        }
    };

    ViewResult::from_series(vec![Series::new(metric, data)])
}

/// `{<metric>: [{time, prediction}, ..], ..}`.
pub fn normalize_historical(body: &Value) -> ViewResult {
    let Some(by_metric) = body.as_object() else {
        tracing::debug!("historical response is not an object");
        return ViewResult::empty();
    };
    log_unknown_keys(by_metric.keys(), "historical", |key| {
        key.parse::<MetricKind>().is_ok()
    });

    let series = MetricKind::ALL
        .into_iter()
        .map(|metric| {
            let data = by_metric
                .get(metric.as_str())
                .and_then(Value::as_array)
                .map(|records| {
                    records
                        .iter()
                        .filter_map(|record| record_sample(record, "prediction"))
                        .collect()
                })
                .unwrap_or_default();
            Series::new(metric, data)
        })
        .collect();

    ViewResult::from_series(series)
}

/// `[{time, filt_<metric>: .., ..}, ..]`.
pub fn normalize_realtime(body: &Value) -> ViewResult {
    let Some(records) = body.as_array() else {
        tracing::debug!("realtime response is not an array");
        return ViewResult::empty();
    };
    if let Some(first) = records.iter().find_map(Value::as_object) {
        log_unknown_keys(first.keys(), "realtime", |key| {
            !key.starts_with("filt_") || MetricKind::ALL.iter().any(|m| m.filtered_key() == key)
        });
    }

    let series = MetricKind::ALL
        .into_iter()
        .map(|metric| {
            let data = records
                .iter()
                .filter_map(|record| record_sample(record, metric.filtered_key()))
                .collect();
            Series::new(metric, data)
        })
        .collect();

    ViewResult::from_series(series)
}

fn record_sample(record: &Value, value_key: &str) -> Option<Sample> {
    let record: &Map<String, Value> = record.as_object()?;
    sample(record.get("time")?, record.get(value_key)?)
}

fn sample(time: &Value, value: &Value) -> Option<Sample> {
    let timestamp = parse_timestamp(time.as_str()?)?;
    let value = round_value(value.as_f64()?)?;
    Some(Sample::new(timestamp, value))
}

fn log_unknown_keys<'a>(
    keys: impl Iterator<Item = &'a String>,
    view: &str,
    known: impl Fn(&str) -> bool,
) {
    for key in keys.filter(|key| !known(key.as_str())) {
        tracing::debug!("ignoring unknown {} key '{}'", view, key);
    }
}
