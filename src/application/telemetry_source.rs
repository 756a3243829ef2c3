// Source trait for dashboard backend data access
use crate::domain::metric::ChartView;
use crate::domain::telemetry::{IrrigationReceipt, TankStatus};
use crate::error::TelemetryError;
use async_trait::async_trait;

/// Identifies whose data a request is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlantRef {
    pub subject: String,
    pub plant: String,
}

impl PlantRef {
    pub fn new(subject: impl Into<String>, plant: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            plant: plant.into(),
        }
    }

    /// Both fields must be set before anything is fetched.
    pub fn is_complete(&self) -> bool {
        !self.subject.trim().is_empty() && !self.plant.trim().is_empty()
    }
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch the unnormalized body for one chart view
    async fn fetch_view(
        &self,
        plant: &PlantRef,
        view: ChartView,
    ) -> Result<serde_json::Value, TelemetryError>;

    /// Latest water tank level
    async fn fetch_tank_status(&self, plant: &PlantRef) -> Result<TankStatus, TelemetryError>;

    /// Trigger a manual irrigation; `None` lets the backend pick the amount
    async fn irrigate(
        &self,
        plant: &PlantRef,
        percentage: Option<f64>,
    ) -> Result<IrrigationReceipt, TelemetryError>;
}
