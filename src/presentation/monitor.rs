// Headless monitor - Logs what a mounted dashboard would render
use crate::application::session::DashboardSession;
use crate::domain::metric::ChartView;
use crate::domain::telemetry::{TankStatus, ViewResult};
use futures::StreamExt;
use std::future::Future;

/// One-line summary of a chart refresh.
pub fn describe_chart(view: ChartView, result: &ViewResult) -> String {
    if result.is_empty {
        return format!("No data available for {}.", view.label());
    }
    result
        .series
        .iter()
        .map(|series| {
            let last = series.data.last().map(|s| s.value).unwrap_or_default();
            format!("{} {} pts (last {})", series.id, series.data.len(), last)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn describe_tank(status: &TankStatus) -> String {
    match (status.level, status.measured_at) {
        (Some(level), Some(at)) => format!("{}% (last updated {})", level, at.format("%Y-%m-%d %H:%M:%S")),
        (Some(level), None) => format!("{}%", level),
        (None, _) => "No tank data available for this plant.".to_string(),
    }
}

/// Logs chart, tank, channel and feed changes until `shutdown` resolves.
pub async fn watch_session(session: &DashboardSession, shutdown: impl Future<Output = ()>) {
    let mut feed = session.feed().subscribe();
    let mut channel = session.watch_channel();
    let mut tank = session.tank().subscribe();
    let mut charts = futures::stream::select_all(session.layout().panels.iter().filter_map(|panel| {
        let view = panel.view;
        let id = panel.id;
        session
            .chart(id)
            .map(|chart| chart.updates().map(move |snapshot| (id, view, snapshot.value)))
    }));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Ok(()) = channel.changed() => {
                let state = *channel.borrow_and_update();
                tracing::info!("push channel {:?}", state);
            }
            Ok(()) = feed.changed() => {
                let entries = feed.borrow_and_update();
                if let Some(latest) = entries.front() {
                    tracing::info!(unread = entries.len(), "{}", latest.text);
                } else {
                    tracing::info!("notifications cleared");
                }
            }
            Ok(()) = tank.changed() => {
                if let Some(status) = tank.borrow_and_update().value.as_ref() {
                    tracing::info!("water tank: {}", describe_tank(status));
                }
            }
            Some((id, view, result)) = charts.next() => {
                if let Some(result) = result {
                    tracing::info!(
                        panel = id,
                        samples = result.sample_count(),
                        "{}",
                        describe_chart(view, &result)
                    );
                }
            }
        }
    }
}
