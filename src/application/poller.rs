// Poller - Periodic fetch, normalize and publish loop
use crate::application::normalizer::normalize;
use crate::application::telemetry_source::{PlantRef, TelemetrySource};
use crate::domain::metric::{ChartView, MetricKind, View};
use crate::domain::telemetry::{TankStatus, ViewResult};
use crate::error::TelemetryError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;

/// One unit of periodic work. Two jobs that compare equal describe the same
/// configuration, so reconfiguring with an equal job does not restart polling.
#[async_trait]
pub trait PollJob: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Whether the job has everything it needs to issue a request
    fn is_runnable(&self) -> bool;

    /// Published when nothing has been fetched successfully yet
    fn fallback(&self) -> Self::Output;

    /// Whether a successful result carries a reading. One that does not is
    /// handled like a failed cycle: the previous value stays published.
    fn is_update(&self, _output: &Self::Output) -> bool {
        true
    }

    async fn run(&self, source: &dyn TelemetrySource) -> Result<Self::Output, TelemetryError>;
}

/// Chart data for one (subject, plant, view, metric) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartJob {
    pub plant: PlantRef,
    pub view: ChartView,
}

impl ChartJob {
    pub fn new(plant: PlantRef, view: ChartView) -> Self {
        Self { plant, view }
    }

    pub fn from_parts(
        subject: impl Into<String>,
        plant: impl Into<String>,
        view: View,
        metric: MetricKind,
    ) -> Self {
        Self::new(PlantRef::new(subject, plant), ChartView::new(view, metric))
    }
}

#[async_trait]
impl PollJob for ChartJob {
    type Output = ViewResult;

    fn is_runnable(&self) -> bool {
        self.plant.is_complete()
    }

    fn fallback(&self) -> ViewResult {
        ViewResult::empty()
    }

    async fn run(&self, source: &dyn TelemetrySource) -> Result<ViewResult, TelemetryError> {
        let body = source.fetch_view(&self.plant, self.view).await?;
        Ok(normalize(self.view, &body))
    }
}

/// Latest water tank level for one plant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TankJob {
    pub plant: PlantRef,
}

impl TankJob {
    pub fn new(plant: PlantRef) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl PollJob for TankJob {
    type Output = TankStatus;

    fn is_runnable(&self) -> bool {
        self.plant.is_complete()
    }

    fn fallback(&self) -> TankStatus {
        TankStatus::unknown()
    }

    fn is_update(&self, status: &TankStatus) -> bool {
        status.has_data()
    }

    async fn run(&self, source: &dyn TelemetrySource) -> Result<TankStatus, TelemetryError> {
        source.fetch_tank_status(&self.plant).await
    }
}

/// Published state of a poll handle. `value` is `None` until the first cycle
/// of the current generation finishes.
#[derive(Debug, Clone)]
pub struct PollSnapshot<T> {
    pub generation: u64,
    pub value: Option<T>,
}

/// Factory for poll handles sharing a source and an interval.
#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn TelemetrySource>,
    interval: Duration,
}

impl Poller {
    pub fn new(source: Arc<dyn TelemetrySource>, interval: Duration) -> Self {
        Self {
            source,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Fetch immediately, then once per interval until the handle is stopped.
    pub fn start<J: PollJob>(&self, job: J) -> PollHandle<J> {
        let (published, _) = watch::channel(PollSnapshot {
            generation: 0,
            value: None,
        });
        let mut handle = PollHandle {
            job,
            source: self.source.clone(),
            interval: self.interval,
            published: Arc::new(published),
            task: None,
        };
        handle.spawn();
        handle
    }

    pub fn stop<J: PollJob>(mut handle: PollHandle<J>) {
        handle.stop();
    }
}

pub struct PollHandle<J: PollJob> {
    job: J,
    source: Arc<dyn TelemetrySource>,
    interval: Duration,
    published: Arc<watch::Sender<PollSnapshot<J::Output>>>,
    task: Option<JoinHandle<()>>,
}

impl<J: PollJob> PollHandle<J> {
    pub fn job(&self) -> &J {
        &self.job
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Latest published value for the current configuration
    pub fn current(&self) -> Option<J::Output> {
        self.published.borrow().value.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<J::Output>> {
        self.published.subscribe()
    }

    pub fn updates(&self) -> WatchStream<PollSnapshot<J::Output>> {
        WatchStream::new(self.subscribe())
    }

    /// Switch to a new configuration. The old loop is torn down and the new
    /// one fetches right away; results still in flight for the old
    /// configuration are discarded.
    pub fn reconfigure(&mut self, job: J) {
        if job == self.job && self.is_active() {
            return;
        }
        tracing::debug!("reconfiguring poller: {:?} -> {:?}", self.job, job);
        self.job = job;
        self.spawn();
    }

    /// Cancel the loop. Nothing is published afterwards. On a multi-thread
    /// runtime a cycle already past its generation check may still issue one
    /// request; use [`PollHandle::shutdown`] to wait for the loop to exit.
    pub fn stop(&mut self) {
        self.published.send_modify(|snapshot| snapshot.generation += 1);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Stops the loop and waits until its task has exited, so no request
    /// is in flight or can start once this returns.
    pub async fn shutdown(mut self) {
        self.published.send_modify(|snapshot| snapshot.generation += 1);
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!("poll task for {:?} ended abnormally: {}", self.job, e);
                }
            }
        }
    }

    fn spawn(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let mut generation = 0;
        self.published.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.value = None;
            generation = snapshot.generation;
        });

        if !self.job.is_runnable() {
            tracing::warn!("poll job {:?} is incomplete, not polling", self.job);
            let fallback = self.job.fallback();
            self.published
                .send_modify(|snapshot| snapshot.value = Some(fallback));
            return;
        }

        let cycle = PollCycle {
            job: self.job.clone(),
            source: self.source.clone(),
            published: self.published.clone(),
            generation,
        };
        let interval = self.interval;
        self.task = Some(tokio::spawn(cycle.run(interval)));
    }
}

impl<J: PollJob> Drop for PollHandle<J> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct PollCycle<J: PollJob> {
    job: J,
    source: Arc<dyn TelemetrySource>,
    published: Arc<watch::Sender<PollSnapshot<J::Output>>>,
    generation: u64,
}

impl<J: PollJob> PollCycle<J> {
    async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.is_current() {
                break;
            }
            if !self.apply(self.job.run(self.source.as_ref()).await) {
                tracing::debug!("discarding stale result for {:?}", self.job);
                break;
            }
        }
    }

    fn is_current(&self) -> bool {
        self.published.borrow().generation == self.generation
    }

    /// Publishes one outcome. Returns false when the generation moved on.
    fn apply(&self, outcome: Result<J::Output, TelemetryError>) -> bool {
        match &outcome {
            Err(e) => tracing::warn!("poll cycle for {:?} failed: {}", self.job, e),
            Ok(value) if !self.job.is_update(value) => {
                tracing::debug!("poll cycle for {:?} returned no reading", self.job)
            }
            Ok(_) => {}
        }

        let mut current = true;
        self.published.send_if_modified(|snapshot| {
            if snapshot.generation != self.generation {
                current = false;
                return false;
            }
            match outcome {
                Ok(value) if self.job.is_update(&value) => {
                    snapshot.value = Some(value);
                    true
                }
                _ if snapshot.value.is_none() => {
                    snapshot.value = Some(self.job.fallback());
                    true
                }
                _ => false,
            }
        });
        current
    }
}
