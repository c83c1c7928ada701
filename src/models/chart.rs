// Chart-ready output handed to the rendering side.

use serde::{Deserialize, Serialize};

use super::{Category, Metric};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: u64,
    pub y: f64,
}

impl Point {
    pub fn new(x: u64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Point after stacking: the layer spans `y0..y0 + y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackedPoint {
    pub x: u64,
    pub y0: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub id: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackedSeries {
    pub id: String,
    pub points: Vec<StackedPoint>,
}

/// Domain bounds of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartExtent {
    pub min_x: u64,
    pub max_x: u64,
    pub max_y: f64,
}

impl ChartExtent {
    /// Maps a point into the unit square. A degenerate axis (zero-width x span or `max_y <= 0`)
    /// collapses to 0 on that axis, so an empty window renders flat instead of dividing by zero.
    pub fn normalize(&self, x: u64, y: f64) -> (f64, f64) {
        let span_x = self.max_x.saturating_sub(self.min_x);
        let nx = if span_x == 0 {
            0.0
        } else {
            x.saturating_sub(self.min_x) as f64 / span_x as f64
        };
        let ny = if self.max_y > 0.0 && y.is_finite() {
            y / self.max_y
        } else {
            0.0
        };
        (nx, ny)
    }
}

/// Latest chart for one category, published after every applied poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFrame {
    pub category: Category,
    pub metric: Metric,
    /// Generation of the fetch that produced this frame.
    pub generation: u64,
    pub window: usize,
    /// Snapshots held in history when the frame was built.
    pub ticks: usize,
    pub series: Vec<StackedSeries>,
    pub extent: ChartExtent,
}

/// Aggregate cluster load over time, x = sample time in unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFrame {
    pub generation: u64,
    pub seconds_since: u64,
    pub jobs_running: Vec<Point>,
    pub workers_running: Vec<Point>,
    pub worker_capacity: Vec<Point>,
    pub extent: ChartExtent,
}

/// Message pushed to `/ws/charts` subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FrameUpdate {
    Chart(ChartFrame),
    Cluster(ClusterFrame),
}
