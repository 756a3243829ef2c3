// Main entry point - Dependency injection and session setup
use std::sync::Arc;

use plant_telemetry::infrastructure::config::load_dashboard_config;
use plant_telemetry::infrastructure::http_source::HttpTelemetrySource;
use plant_telemetry::infrastructure::ws_connector::WsConnector;
use plant_telemetry::presentation::monitor::watch_session;
use plant_telemetry::{DashboardSession, Identity};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config()?;
    config.log_config();

    let Some(subject) = config.session.subject.clone() else {
        anyhow::bail!("session.subject must be set (config/dashboard.toml or PLANT__SESSION__SUBJECT)");
    };
    let plant = config.session.plant.clone().unwrap_or_default();

    // Create adapters (infrastructure layer)
    let source = Arc::new(HttpTelemetrySource::new(
        config.backend.base_url.clone(),
        config.backend.request_timeout(),
    )?);
    let connector = Arc::new(WsConnector::new(config.channel.url.clone()));

    // Mount the dashboard session (application layer)
    let session = DashboardSession::mount(
        &config.session_settings(),
        source,
        connector,
        Identity::new(Some(subject)),
        plant,
    );

    watch_session(&session, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
        }
    })
    .await;

    session.unmount().await;
    Ok(())
}
