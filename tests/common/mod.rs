// Shared test helpers
#![allow(dead_code)]

use clusterwatch::error::FetchError;
use clusterwatch::models::*;
use clusterwatch::source::SnapshotSource;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const VALID_CONFIG: &str = r#"
[server]
port = 8084
host = "0.0.0.0"

[source]
base_url = "http://master:8083"

[polling]
interval_ms = 1000
window_size = 60

[publishing]
broadcast_capacity = 32

[monitoring]
stats_log_interval_secs = 60
"#;

/// Snapshot of jobs with the given remaining-task counts.
pub fn jobs(entries: &[(&str, f64)]) -> Snapshot {
    Snapshot::new(
        entries
            .iter()
            .map(|(id, v)| Observation::new(*id).with(Metric::Remaining, *v))
            .collect(),
    )
}

pub fn nodes(entries: &[(&str, f64)]) -> Snapshot {
    Snapshot::new(
        entries
            .iter()
            .map(|(id, v)| Observation::new(*id).with(Metric::RunningJobs, *v))
            .collect(),
    )
}

pub fn timeout_error() -> FetchError {
    FetchError::Timeout {
        url: "http://master/jobs/".into(),
    }
}

pub fn cluster_stat(at: i64, jobs: i64, running: i64, available: i64) -> ClusterStat {
    ClusterStat {
        snapshot_at: at,
        jobs_running: jobs,
        jobs_pending: 0,
        workers_running: running,
        workers_available: available,
    }
}

/// Source that replays queued results per category; an empty queue reads as a timeout.
#[derive(Default)]
pub struct ScriptedSource {
    snapshots: Mutex<HashMap<Category, VecDeque<Result<Snapshot, FetchError>>>>,
    cluster: Mutex<VecDeque<Result<Vec<ClusterStat>, FetchError>>>,
    cluster_requests: Mutex<Vec<u64>>,
}

impl ScriptedSource {
    pub fn push(&self, category: Category, result: Result<Snapshot, FetchError>) {
        self.snapshots
            .lock()
            .unwrap()
            .entry(category)
            .or_default()
            .push_back(result);
    }

    pub fn push_cluster(&self, result: Result<Vec<ClusterStat>, FetchError>) {
        self.cluster.lock().unwrap().push_back(result);
    }

    pub fn cluster_requests(&self) -> Vec<u64> {
        self.cluster_requests.lock().unwrap().clone()
    }
}

impl SnapshotSource for ScriptedSource {
    async fn fetch(&self, category: Category) -> Result<Snapshot, FetchError> {
        let next = self
            .snapshots
            .lock()
            .unwrap()
            .get_mut(&category)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| Err(timeout_error()))
    }

    async fn fetch_cluster(&self, seconds_since: u64) -> Result<Vec<ClusterStat>, FetchError> {
        self.cluster_requests.lock().unwrap().push(seconds_since);
        let next = self.cluster.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(timeout_error()))
    }
}
