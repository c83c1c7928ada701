// JSON shapes served by the cluster master (PascalCase field names).
// Fields the dashboard does not chart are still decoded so frames can be logged/debugged.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Metric, Observation, Snapshot};

/// `{ NumberOfItems, Items: [...] }`. A missing or `null` `Items` decodes as empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct ItemList<T> {
    #[serde(default)]
    pub number_of_items: usize,
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub items: Vec<T>,
}

/// The master encodes an empty list as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskProgress {
    pub total: i64,
    pub finished: i64,
    pub errored: i64,
}

impl TaskProgress {
    pub fn remaining(&self) -> i64 {
        (self.total - self.finished - self.errored).max(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JobDetails {
    pub job_id: String,
    pub uri: String,
    pub owner: String,
    pub label: String,
    #[serde(rename = "Type")]
    pub type_: String,
    pub first_created: String,
    pub last_modified: String,
    pub progress: TaskProgress,
    pub state: String,
    pub status: String,
}

impl JobDetails {
    pub fn to_observation(&self) -> Observation {
        Observation::new(self.job_id.clone())
            .with(Metric::Total, self.progress.total as f64)
            .with(Metric::Finished, self.progress.finished as f64)
            .with(Metric::Errored, self.progress.errored as f64)
            .with(Metric::Remaining, self.progress.remaining() as f64)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WorkerNode {
    pub node_id: String,
    pub uri: String,
    pub hostname: String,
    pub max_jobs: i64,
    pub running_jobs: i64,
    pub running: bool,
}

impl WorkerNode {
    pub fn to_observation(&self) -> Observation {
        Observation::new(self.node_id.clone())
            .with(Metric::RunningJobs, self.running_jobs as f64)
            .with(Metric::MaxJobs, self.max_jobs as f64)
            .with(
                Metric::AvailableJobs,
                (self.max_jobs - self.running_jobs).max(0) as f64,
            )
    }
}

/// One periodic sample from `/cluster?since=`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClusterStat {
    /// Unix seconds.
    pub snapshot_at: i64,
    pub jobs_running: i64,
    pub jobs_pending: i64,
    pub workers_running: i64,
    pub workers_available: i64,
}

/// Entries without an id can't be tracked across polls and are skipped.
pub fn jobs_snapshot(list: &ItemList<JobDetails>) -> Snapshot {
    Snapshot::new(
        list.items
            .iter()
            .filter(|j| !j.job_id.is_empty())
            .map(JobDetails::to_observation)
            .collect(),
    )
}

pub fn nodes_snapshot(list: &ItemList<WorkerNode>) -> Snapshot {
    Snapshot::new(
        list.items
            .iter()
            .filter(|n| !n.node_id.is_empty())
            .map(WorkerNode::to_observation)
            .collect(),
    )
}
