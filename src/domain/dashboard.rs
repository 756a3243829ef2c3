// Dashboard layout domain model
use super::metric::{ChartView, MetricKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPanel {
    pub id: &'static str,
    pub title: &'static str,
    pub view: ChartView,
}

impl ChartPanel {
    pub const fn new(id: &'static str, title: &'static str, view: ChartView) -> Self {
        Self { id, title, view }
    }
}

/// Chart panels of the plant dashboard, in display order.
pub const PANELS: [ChartPanel; 6] = [
    ChartPanel::new(
        "temperature",
        "Temperature Over Time",
        ChartView::Raw(MetricKind::Temperature),
    ),
    ChartPanel::new(
        "humidity",
        "Humidity Over Time",
        ChartView::Raw(MetricKind::Humidity),
    ),
    ChartPanel::new("ph", "PH Over Time", ChartView::Raw(MetricKind::Ph)),
    ChartPanel::new(
        "moisture",
        "Soil Moisture Over Time",
        ChartView::Raw(MetricKind::Moisture),
    ),
    ChartPanel::new("historical", "Historical Analysis", ChartView::Historical),
    ChartPanel::new("realtime", "Real Time Analysis", ChartView::Realtime),
];

#[derive(Debug, Clone)]
pub struct DashboardLayout {
    pub panels: Vec<ChartPanel>,
    main: usize,
}

impl DashboardLayout {
    pub fn new(panels: Vec<ChartPanel>) -> Self {
        Self { panels, main: 0 }
    }

    pub fn main_panel(&self) -> Option<&ChartPanel> {
        self.panels.get(self.main)
    }

    /// Promotes a panel to the main slot. Unknown ids leave the layout as is.
    pub fn select(&mut self, panel_id: &str) -> bool {
        match self.panels.iter().position(|p| p.id == panel_id) {
            Some(index) => {
                self.main = index;
                true
            }
            None => false,
        }
    }
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self::new(PANELS.to_vec())
    }
}
