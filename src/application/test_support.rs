// In-memory doubles shared by the application tests
use crate::application::push_connector::{PushConnection, PushConnector};
use crate::application::telemetry_source::{PlantRef, TelemetrySource};
use crate::domain::metric::ChartView;
use crate::domain::telemetry::{IrrigationReceipt, TankStatus};
use crate::error::{ChannelError, TelemetryError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Lets spawned tasks run; with a paused clock this advances time by 1ms.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Default)]
pub struct FakeSource {
    views: Mutex<HashMap<String, Value>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    tank: Mutex<Option<f64>>,
    failing: AtomicBool,
    view_calls: Mutex<Vec<(PlantRef, ChartView)>>,
    irrigations: Mutex<Vec<(PlantRef, Option<f64>)>>,
}

impl FakeSource {
    pub fn set_view(&self, plant: &str, body: Value) {
        self.views.lock().unwrap().insert(plant.to_string(), body);
    }

    pub fn set_tank(&self, level: Option<f64>) {
        *self.tank.lock().unwrap() = level;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fetches for `plant` block until the returned notify fires.
    pub fn gate(&self, plant: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(plant.to_string(), gate.clone());
        gate
    }

    pub fn view_calls(&self) -> usize {
        self.view_calls.lock().unwrap().len()
    }

    pub fn view_calls_for(&self, plant: &str) -> usize {
        self.view_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.plant == plant)
            .count()
    }

    pub fn last_view_plant(&self) -> Option<String> {
        self.view_calls
            .lock()
            .unwrap()
            .last()
            .map(|(p, _)| p.plant.clone())
    }

    pub fn irrigations(&self) -> Vec<(PlantRef, Option<f64>)> {
        self.irrigations.lock().unwrap().clone()
    }

    fn check_failing(&self) -> Result<(), TelemetryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TelemetryError::Unavailable("backend down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for FakeSource {
    async fn fetch_view(&self, plant: &PlantRef, view: ChartView) -> Result<Value, TelemetryError> {
        self.view_calls
            .lock()
            .unwrap()
            .push((plant.clone(), view));
        let gate = self.gates.lock().unwrap().get(&plant.plant).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failing()?;
        self.views
            .lock()
            .unwrap()
            .get(&plant.plant)
            .cloned()
            .ok_or_else(|| TelemetryError::Status {
                url: format!("fake://{}", plant.plant),
                status: 404,
                body: "No data available".to_string(),
            })
    }

    async fn fetch_tank_status(&self, _plant: &PlantRef) -> Result<TankStatus, TelemetryError> {
        self.check_failing()?;
        Ok(TankStatus {
            level: *self.tank.lock().unwrap(),
            measured_at: None,
        })
    }

    async fn irrigate(
        &self,
        plant: &PlantRef,
        percentage: Option<f64>,
    ) -> Result<IrrigationReceipt, TelemetryError> {
        self.check_failing()?;
        self.irrigations
            .lock()
            .unwrap()
            .push((plant.clone(), percentage));
        Ok(IrrigationReceipt {
            percentage_used: percentage.or(Some(20.0)),
        })
    }
}

/// Server side of one fake push connection.
pub struct FakePeer {
    pub outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<Result<String, ChannelError>>,
    closed: Arc<AtomicBool>,
}

impl FakePeer {
    pub fn push(&self, text: &str) {
        let _ = self.inbound.send(Ok(text.to_string()));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.inbound.send(Err(ChannelError::Transport(reason.to_string())));
    }

    /// Drops the inbound side so the client sees a clean close.
    pub fn hang_up(self) {}

    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeConnection {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<Result<String, ChannelError>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl PushConnection for FakeConnection {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.outbound
            .send(text)
            .map_err(|_| ChannelError::Transport("peer gone".to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector handing out in-memory connections. Attempts fail while
/// `refuse` is set.
#[derive(Default)]
pub struct FakeConnector {
    attempts: AtomicUsize,
    refuse: AtomicBool,
    peers: Mutex<Vec<FakePeer>>,
}

impl FakeConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn set_refusing(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Takes the peer of the most recent successful connection.
    pub fn take_peer(&self) -> Option<FakePeer> {
        self.peers.lock().unwrap().pop()
    }
}

#[async_trait]
impl PushConnector for FakeConnector {
    fn endpoint(&self) -> &str {
        "fake://push"
    }

    async fn connect(&self) -> Result<Box<dyn PushConnection>, ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ChannelError::Connect {
                url: self.endpoint().to_string(),
                reason: "connection refused".to_string(),
            });
        }
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.peers.lock().unwrap().push(FakePeer {
            outbound: out_rx,
            inbound: in_tx,
            closed: closed.clone(),
        });
        Ok(Box::new(FakeConnection {
            outbound: out_tx,
            inbound: in_rx,
            closed,
        }))
    }
}
