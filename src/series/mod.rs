// Series builder: history of snapshots -> per-entity series -> zero-filled, stacked chart frame.
// Pure functions of their input; rebuilt from the full history on every applied poll.
//
// Zero-fill policy: the closed tick range [0, window - 1] gets exactly one point per tick.
// Ticks where an entity was not observed (before its first sighting, after its last one, and
// gaps in between) read as 0, so stacked layers always share the same x domain.

pub mod cluster;

use indexmap::IndexMap;

use crate::history::History;
use crate::models::{
    Category, ChartExtent, ChartFrame, ChartSeries, Metric, Point, Snapshot, StackedPoint,
    StackedSeries,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesOptions {
    pub window: usize,
    pub metric: Metric,
    /// Drop series whose every value is 0.
    pub filter_all_zero: bool,
}

/// Per-entity sparse series, keyed in first-sighting order. Point x is the snapshot's position
/// in `snapshots` (0 = oldest). An id repeated within one snapshot keeps its last value.
pub fn entity_series<'a, I>(snapshots: I, metric: Metric) -> IndexMap<String, Vec<Point>>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut series: IndexMap<String, Vec<Point>> = IndexMap::new();
    for (tick, snapshot) in snapshots.into_iter().enumerate() {
        let x = tick as u64;
        for obs in &snapshot.observations {
            let y = obs.value(metric);
            let points = series.entry(obs.id.clone()).or_default();
            match points.last_mut() {
                Some(last) if last.x == x => last.y = y,
                _ => points.push(Point::new(x, y)),
            }
        }
    }
    series
}

pub fn is_all_zero(points: &[Point]) -> bool {
    points.iter().all(|p| p.y == 0.0)
}

/// Dense series over `[0, window - 1]`. Points with `x >= window` are dropped.
pub fn zero_fill(points: &[Point], window: usize) -> Vec<Point> {
    let mut filled: Vec<Point> = (0..window as u64).map(|x| Point::new(x, 0.0)).collect();
    for p in points {
        if let Some(slot) = usize::try_from(p.x).ok().and_then(|i| filled.get_mut(i)) {
            slot.y = p.y;
        }
    }
    filled
}

/// Chart series set for the most recent `window` snapshots of `history`.
pub fn build_series(history: &History, options: &SeriesOptions) -> Vec<ChartSeries> {
    if options.window == 0 || history.is_empty() {
        return Vec::new();
    }
    entity_series(history.recent(options.window), options.metric)
        .into_iter()
        .filter(|(_, points)| !options.filter_all_zero || !is_all_zero(points))
        .map(|(id, points)| ChartSeries {
            points: zero_fill(&points, options.window),
            id,
        })
        .collect()
}

/// Zero-offset stacking: each layer's baseline is the sum of the layers before it at the same x.
pub fn stack(series: &[ChartSeries]) -> Vec<StackedSeries> {
    let mut baseline: IndexMap<u64, f64> = IndexMap::new();
    series
        .iter()
        .map(|s| StackedSeries {
            id: s.id.clone(),
            points: s
                .points
                .iter()
                .map(|p| {
                    let y0 = baseline.entry(p.x).or_insert(0.0);
                    let stacked = StackedPoint {
                        x: p.x,
                        y0: *y0,
                        y: p.y,
                    };
                    *y0 += p.y;
                    stacked
                })
                .collect(),
        })
        .collect()
}

/// x spans the window; y is the top of the highest stacked layer (0 when there is none).
pub fn stacked_extent(series: &[StackedSeries], window: usize) -> ChartExtent {
    let max_y = series
        .iter()
        .flat_map(|s| s.points.iter())
        .map(|p| p.y0 + p.y)
        .fold(0.0_f64, f64::max);
    ChartExtent {
        min_x: 0,
        max_x: window.saturating_sub(1) as u64,
        max_y,
    }
}

/// Builds the frame published for one category after a poll was applied.
pub fn build_frame(
    category: Category,
    history: &History,
    options: &SeriesOptions,
    generation: u64,
) -> ChartFrame {
    let stacked = stack(&build_series(history, options));
    let extent = stacked_extent(&stacked, options.window);
    ChartFrame {
        category,
        metric: options.metric,
        generation,
        window: options.window,
        ticks: history.len().min(options.window),
        series: stacked,
        extent,
    }
}
