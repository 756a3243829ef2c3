// Dashboard session - Everything one mounted dashboard owns
use crate::application::channel_client::ChannelClient;
use crate::application::channel_machine::ChannelState;
use crate::application::identity::Identity;
use crate::application::notification_feed::NotificationFeed;
use crate::application::poller::{ChartJob, PollHandle, Poller, TankJob};
use crate::application::push_connector::PushConnector;
use crate::application::telemetry_source::{PlantRef, TelemetrySource};
use crate::domain::dashboard::DashboardLayout;
use crate::domain::telemetry::IrrigationReceipt;
use crate::error::TelemetryError;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub chart_interval: Duration,
    pub tank_interval: Duration,
    pub reconnect_delay: Duration,
    pub feed_max_len: Option<usize>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            chart_interval: Duration::from_secs(30),
            tank_interval: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(3),
            feed_max_len: None,
        }
    }
}

/// Created on dashboard mount, destroyed by [`DashboardSession::unmount`].
/// Pollers and the push channel live exactly as long as the session.
pub struct DashboardSession {
    source: Arc<dyn TelemetrySource>,
    identity: Identity,
    plant: String,
    layout: DashboardLayout,
    feed: NotificationFeed,
    channel: ChannelClient,
    charts: Vec<PollHandle<ChartJob>>,
    tank: PollHandle<TankJob>,
}

impl DashboardSession {
    pub fn mount(
        settings: &SessionSettings,
        source: Arc<dyn TelemetrySource>,
        connector: Arc<dyn PushConnector>,
        identity: Identity,
        plant: impl Into<String>,
    ) -> Self {
        let plant = plant.into();
        let layout = DashboardLayout::default();
        let feed = NotificationFeed::with_max_len(settings.feed_max_len);
        let channel = ChannelClient::spawn(
            connector,
            identity.clone(),
            feed.clone(),
            settings.reconnect_delay,
        );

        let plant_ref = PlantRef::new(identity.current().unwrap_or_default(), plant.clone());
        tracing::info!(
            "mounting dashboard for {:?} on plant '{}'",
            identity.current(),
            plant
        );

        let chart_poller = Poller::new(source.clone(), settings.chart_interval);
        let charts = layout
            .panels
            .iter()
            .map(|panel| chart_poller.start(ChartJob::new(plant_ref.clone(), panel.view)))
            .collect();
        let tank = Poller::new(source.clone(), settings.tank_interval).start(TankJob::new(plant_ref));

        Self {
            source,
            identity,
            plant,
            layout,
            feed,
            channel,
            charts,
            tank,
        }
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn plant(&self) -> &str {
        &self.plant
    }

    pub fn layout(&self) -> &DashboardLayout {
        &self.layout
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn watch_channel(&self) -> watch::Receiver<ChannelState> {
        self.channel.watch_state()
    }

    pub fn chart(&self, panel_id: &str) -> Option<&PollHandle<ChartJob>> {
        let index = self.layout.panels.iter().position(|p| p.id == panel_id)?;
        self.charts.get(index)
    }

    pub fn main_chart(&self) -> Option<&PollHandle<ChartJob>> {
        self.chart(self.layout.main_panel()?.id)
    }

    pub fn tank(&self) -> &PollHandle<TankJob> {
        &self.tank
    }

    pub fn select_panel(&mut self, panel_id: &str) -> bool {
        self.layout.select(panel_id)
    }

    /// Point every poller at another plant. Each restarts with an immediate
    /// fetch; nothing from the previous plant is published afterwards.
    pub fn select_plant(&mut self, plant: impl Into<String>) {
        let plant = plant.into();
        if plant == self.plant {
            return;
        }
        tracing::info!("switching dashboard from plant '{}' to '{}'", self.plant, plant);
        self.plant = plant;
        self.restart_pollers();
    }

    /// Switch the session to another subject. Pollers restart under the new
    /// subject right away; the push channel drops its connection and
    /// identifies again as soon as it sees the change.
    pub fn set_subject(&mut self, subject: Option<String>) {
        if subject.as_deref().filter(|s| !s.is_empty()) == self.identity.current().as_deref() {
            return;
        }
        tracing::info!(
            "switching dashboard from {:?} to {:?}",
            self.identity.current(),
            subject
        );
        self.identity.set(subject);
        self.restart_pollers();
    }

    /// Ask the backend to water the selected plant now.
    pub async fn irrigate(&self, percentage: Option<f64>) -> Result<IrrigationReceipt, TelemetryError> {
        let plant_ref = self.plant_ref();
        if !plant_ref.is_complete() {
            return Err(TelemetryError::Unavailable(
                "no plant selected for irrigation".to_string(),
            ));
        }
        let receipt = self.source.irrigate(&plant_ref, percentage).await?;
        tracing::info!(
            "irrigation requested for plant '{}' ({:?}% used)",
            plant_ref.plant,
            receipt.percentage_used
        );
        Ok(receipt)
    }

    /// Stop all polling and close the push channel. Returns once every
    /// poll loop and the channel driver have exited.
    pub async fn unmount(self) {
        join_all(self.charts.into_iter().map(PollHandle::shutdown)).await;
        self.tank.shutdown().await;
        self.channel.teardown().await;
        tracing::info!("dashboard for plant '{}' unmounted", self.plant);
    }

    fn plant_ref(&self) -> PlantRef {
        PlantRef::new(self.identity.current().unwrap_or_default(), self.plant.clone())
    }

    fn restart_pollers(&mut self) {
        let plant_ref = self.plant_ref();
        for (panel, chart) in self.layout.panels.iter().zip(self.charts.iter_mut()) {
            chart.reconfigure(ChartJob::new(plant_ref.clone(), panel.view));
        }
        self.tank.reconfigure(TankJob::new(plant_ref));
    }
}
