// Notification domain model
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Alert,
    Irrigation,
}

/// Immutable entry of the notification feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
    pub produced_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, text: impl Into<String>, produced_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            text: text.into(),
            produced_at,
        }
    }
}

/// Event received over the push channel after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Alert {
        message: String,
        timestamp: EventTime,
    },
    Irrigation {
        percentage: f64,
        plant: String,
        timestamp: EventTime,
    },
}

/// Event timestamp as sent by the backend. Unparsable stamps are kept verbatim
/// so the notification still shows what was received.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    Parsed(DateTime<Utc>),
    Verbatim(String),
}

impl EventTime {
    fn clock(&self) -> String {
        match self {
            EventTime::Parsed(time) => time.format("%H:%M:%S").to_string(),
            EventTime::Verbatim(raw) => raw.clone(),
        }
    }
}

impl PushEvent {
    pub fn into_notification(self, received_at: DateTime<Utc>) -> Notification {
        match self {
            PushEvent::Alert { message, timestamp } => Notification::new(
                NotificationKind::Alert,
                format!("🔔 {} ({})", message, timestamp.clock()),
                received_at,
            ),
            PushEvent::Irrigation {
                percentage,
                plant,
                timestamp,
            } => Notification::new(
                NotificationKind::Irrigation,
                format!(
                    "💧 Irrigated {}% on plant {} ({})",
                    percentage,
                    plant,
                    timestamp.clock()
                ),
                received_at,
            ),
        }
    }
}
