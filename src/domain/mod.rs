// Domain layer - Plain data types shared by every other layer
pub mod dashboard;
pub mod metric;
pub mod notification;
pub mod telemetry;
