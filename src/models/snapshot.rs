// Poll-tick snapshots: per-entity observations keyed by a stable id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Polled entity category. Each category keeps its own history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Jobs,
    Nodes,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Jobs, Category::Nodes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Jobs => "jobs",
            Category::Nodes => "nodes",
        }
    }

    /// Metric charted for this category when the config does not name one.
    pub fn default_metric(&self) -> Metric {
        match self {
            Category::Jobs => Metric::Remaining,
            Category::Nodes => Metric::RunningJobs,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric field carried by an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    // jobs
    Total,
    Finished,
    Errored,
    /// total - finished - errored, never negative.
    Remaining,
    // nodes
    RunningJobs,
    MaxJobs,
    /// maxJobs - runningJobs, never negative.
    AvailableJobs,
}

impl Metric {
    pub fn belongs_to(&self, category: Category) -> bool {
        match self {
            Metric::Total | Metric::Finished | Metric::Errored | Metric::Remaining => {
                category == Category::Jobs
            }
            Metric::RunningJobs | Metric::MaxJobs | Metric::AvailableJobs => {
                category == Category::Nodes
            }
        }
    }
}

/// One entity at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    pub metrics: BTreeMap<Metric, f64>,
}

impl Observation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    /// Missing metrics read as 0.
    pub fn value(&self, metric: Metric) -> f64 {
        self.metrics.get(&metric).copied().unwrap_or(0.0)
    }
}

/// Result of one successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub observations: Vec<Observation>,
}

impl Snapshot {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
