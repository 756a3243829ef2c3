// Presentation layer - Operator-facing output
pub mod monitor;
