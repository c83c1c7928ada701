// Domain models: snapshots in, chart frames out, plus the master's wire shapes.

mod chart;
mod snapshot;
pub mod wire;

pub use chart::{
    ChartExtent, ChartFrame, ChartSeries, ClusterFrame, FrameUpdate, Point, StackedPoint,
    StackedSeries,
};
pub use snapshot::{Category, Metric, Observation, Snapshot};
pub use wire::{ClusterStat, ItemList, JobDetails, TaskProgress, WorkerNode};
