// Classification of inbound push-channel frames
use crate::domain::notification::{EventTime, PushEvent};
use crate::domain::telemetry::parse_timestamp;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A classified frame and the subject it is addressed to, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub event: PushEvent,
    pub target: Option<String>,
}

impl Inbound {
    /// Untargeted frames are broadcasts and reach everyone.
    pub fn is_for(&self, identity: Option<&str>) -> bool {
        match (&self.target, identity) {
            (None, _) => true,
            (Some(target), Some(identity)) => target == identity,
            (Some(_), None) => false,
        }
    }
}

/// Returns `None` for anything that is not a known event shape.
pub fn classify(text: &str) -> Option<Inbound> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("dropping unparsable push frame: {}", e);
            return None;
        }
    };
    let Some(frame) = value.as_object() else {
        tracing::debug!("dropping non-object push frame: {}", text);
        return None;
    };

    let event = alert(frame).or_else(|| irrigation(frame));
    if event.is_none() {
        tracing::debug!("dropping unrecognized push frame: {}", text);
    }
    event.map(|event| Inbound {
        event,
        target: target(frame),
    })
}

fn alert(frame: &Map<String, Value>) -> Option<PushEvent> {
    let message = non_empty_str(frame.get("alert"))?;
    let timestamp = event_time(frame.get("timestamp"))?;
    Some(PushEvent::Alert {
        message: message.to_string(),
        timestamp,
    })
}

fn irrigation(frame: &Map<String, Value>) -> Option<PushEvent> {
    if frame.get("type").and_then(Value::as_str) != Some("irrigation") {
        return None;
    }
    let percentage = frame.get("percentage").and_then(Value::as_f64)?;
    let plant = match frame.get("plant")? {
        Value::String(plant) if !plant.is_empty() => plant.clone(),
        Value::Number(plant) => plant.to_string(),
        _ => return None,
    };
    let timestamp = event_time(frame.get("timestamp"))?;
    Some(PushEvent::Irrigation {
        percentage,
        plant,
        timestamp,
    })
}

fn target(frame: &Map<String, Value>) -> Option<String> {
    ["subject", "username", "owner"]
        .into_iter()
        .find_map(|key| non_empty_str(frame.get(key)))
        .map(str::to_string)
}

fn event_time(value: Option<&Value>) -> Option<EventTime> {
    match value? {
        Value::String(raw) if !raw.is_empty() => Some(
            parse_timestamp(raw)
                .map(EventTime::Parsed)
                .unwrap_or_else(|| EventTime::Verbatim(raw.clone())),
        ),
        Value::Number(millis) => millis
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(EventTime::Parsed),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
