//! Realtime telemetry synchronization for the plant-monitoring dashboard.
//!
//! Two independent halves share one [`DashboardSession`]:
//! - chart data, polled per (subject, plant, view, metric) and normalized
//!   into a uniform multi-series model;
//! - push notifications, received over a reconnecting channel, filtered
//!   per subject and kept in a newest-first feed.
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::channel_machine::ChannelState;
pub use application::identity::Identity;
pub use application::normalizer::normalize;
pub use application::notification_feed::NotificationFeed;
pub use application::poller::{ChartJob, PollHandle, Poller, TankJob};
pub use application::session::{DashboardSession, SessionSettings};
pub use domain::metric::{ChartView, MetricKind, View};
pub use domain::notification::Notification;
pub use domain::telemetry::{Sample, Series, ViewResult};
pub use error::{ChannelError, TelemetryError};
