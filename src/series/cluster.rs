// Cluster load stream: the master's periodic cluster samples reshaped into three aggregate series.

use crate::models::{ChartExtent, ClusterFrame, ClusterStat, Point};

/// Samples ordered by time; negative timestamps are dropped. Worker capacity is
/// `WorkersRunning + WorkersAvailable`.
pub fn cluster_frame(stats: &[ClusterStat], generation: u64, seconds_since: u64) -> ClusterFrame {
    let mut samples: Vec<(u64, &ClusterStat)> = stats
        .iter()
        .filter_map(|s| u64::try_from(s.snapshot_at).ok().map(|at| (at, s)))
        .collect();
    samples.sort_by_key(|(at, _)| *at);

    let series = |f: fn(&ClusterStat) -> i64| -> Vec<Point> {
        samples
            .iter()
            .map(|(at, s)| Point::new(*at, f(s) as f64))
            .collect()
    };
    let jobs_running = series(|s| s.jobs_running);
    let workers_running = series(|s| s.workers_running);
    let worker_capacity = series(|s| s.workers_running + s.workers_available);

    let max_y = jobs_running
        .iter()
        .chain(&workers_running)
        .chain(&worker_capacity)
        .map(|p| p.y)
        .fold(0.0_f64, f64::max);
    let extent = ChartExtent {
        min_x: samples.first().map(|(at, _)| *at).unwrap_or(0),
        max_x: samples.last().map(|(at, _)| *at).unwrap_or(0),
        max_y,
    };

    ClusterFrame {
        generation,
        seconds_since,
        jobs_running,
        workers_running,
        worker_capacity,
        extent,
    }
}
