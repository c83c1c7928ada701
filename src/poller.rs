// Snapshot poller: fixed-interval fetches per category, bounded history, frame publishing.
// Fetches run as spawned tasks and report back on a channel; only the poller task touches
// history. Every fetch carries a per-category generation, and completions that are not newer
// than the last applied generation (or that were issued before a reset) are discarded.

use crate::error::{ApiError, FetchError};
use crate::history::History;
use crate::models::{
    Category, ChartFrame, ClusterFrame, ClusterStat, FrameUpdate, Metric, Snapshot,
};
use crate::series::{self, SeriesOptions, cluster::cluster_frame};
use crate::source::SnapshotSource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

/// Rate limit for repeated fetch-failure warnings per stream.
const FETCH_FAILURE_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Capacity of the channel fetch tasks report completions on.
const COMPLETION_CHANNEL_CAPACITY: usize = 64;

const COMMAND_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCommand {
    /// Manual refresh: clear the category's history and fetch right away.
    Reset(Category),
}

/// Runtime-adjustable inputs shared between the poller and the API.
#[derive(Debug, Clone)]
pub struct PollerControls {
    window: Arc<AtomicUsize>,
    seconds_since: Arc<AtomicU64>,
    commands: mpsc::Sender<PollerCommand>,
}

impl PollerControls {
    pub fn new(
        window: NonZeroUsize,
        seconds_since: NonZeroU64,
    ) -> (Self, mpsc::Receiver<PollerCommand>) {
        let (commands, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let controls = Self {
            window: Arc::new(AtomicUsize::new(window.get())),
            seconds_since: Arc::new(AtomicU64::new(seconds_since.get())),
            commands,
        };
        (controls, command_rx)
    }

    /// Window read by the poller at every tick.
    pub fn window(&self) -> usize {
        self.window.load(Ordering::Relaxed)
    }

    pub fn set_window(&self, window: NonZeroUsize) {
        self.window.store(window.get(), Ordering::Relaxed);
    }

    pub fn seconds_since(&self) -> u64 {
        self.seconds_since.load(Ordering::Relaxed)
    }

    pub fn set_seconds_since(&self, seconds: NonZeroU64) {
        self.seconds_since.store(seconds.get(), Ordering::Relaxed);
    }

    pub fn reset(&self, category: Category) -> Result<(), ApiError> {
        self.commands
            .try_send(PollerCommand::Reset(category))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    ApiError::BadRequest("a refresh is already pending".into())
                }
                mpsc::error::TrySendError::Closed(_) => ApiError::PollerUnavailable,
            })
    }
}

/// Latest published frames, one per category plus the cluster stream.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub charts: BTreeMap<Category, ChartFrame>,
    pub cluster: Option<ClusterFrame>,
}

/// Result of one fetch task, tagged with the generation it was issued under.
#[derive(Debug)]
pub enum Completion {
    Category {
        category: Category,
        generation: u64,
        result: Result<Snapshot, FetchError>,
    },
    Cluster {
        generation: u64,
        seconds_since: u64,
        result: Result<Vec<ClusterStat>, FetchError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Issued before the last applied fetch or before a reset.
    Stale,
    Failed,
    /// Response had no items; nothing appended.
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerStats {
    pub applied: u64,
    pub stale: u64,
    pub failed: u64,
    pub empty: u64,
}

/// Generation bookkeeping for one fetch stream.
#[derive(Debug, Default)]
struct Generations {
    issued: u64,
    applied: u64,
    /// Completions at or below this generation predate a reset.
    floor: u64,
    last_failure_warn: Option<Instant>,
}

impl Generations {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn accepts(&self, generation: u64) -> bool {
        generation > self.applied && generation > self.floor
    }

    fn mark_applied(&mut self, generation: u64) {
        self.applied = generation;
    }

    fn reset(&mut self) {
        self.floor = self.issued;
    }

    fn should_warn(&mut self) -> bool {
        let warn = self
            .last_failure_warn
            .is_none_or(|t| t.elapsed() >= FETCH_FAILURE_WARN_INTERVAL);
        if warn {
            self.last_failure_warn = Some(Instant::now());
        }
        warn
    }
}

#[derive(Debug, Default)]
struct CategoryState {
    history: History,
    generations: Generations,
}

/// Poller timing and series options.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval_ms: u64,
    pub filter_all_zero: bool,
    pub metrics: BTreeMap<Category, Metric>,
    pub cluster_enabled: bool,
    /// How often to log poller stats (real seconds).
    pub stats_log_interval_secs: u64,
}

impl PollerConfig {
    fn metric(&self, category: Category) -> Metric {
        self.metrics
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_metric())
    }
}

/// Source, controls and publishing channels for the poller.
pub struct PollerDeps<S> {
    pub source: Arc<S>,
    pub controls: PollerControls,
    pub board_tx: watch::Sender<Board>,
    pub updates_tx: broadcast::Sender<FrameUpdate>,
}

/// Poller state. Driven by [`spawn`] in production; tests drive it directly.
pub struct Poller<S> {
    source: Arc<S>,
    controls: PollerControls,
    config: PollerConfig,
    board_tx: watch::Sender<Board>,
    updates_tx: broadcast::Sender<FrameUpdate>,
    completions_tx: mpsc::Sender<Completion>,
    categories: BTreeMap<Category, CategoryState>,
    cluster: Generations,
    stats: PollerStats,
}

impl<S: SnapshotSource> Poller<S> {
    pub fn new(deps: PollerDeps<S>, config: PollerConfig) -> (Self, mpsc::Receiver<Completion>) {
        let (completions_tx, completions_rx) = mpsc::channel(COMPLETION_CHANNEL_CAPACITY);
        let poller = Self {
            source: deps.source,
            controls: deps.controls,
            config,
            board_tx: deps.board_tx,
            updates_tx: deps.updates_tx,
            completions_tx,
            categories: Category::ALL
                .into_iter()
                .map(|c| (c, CategoryState::default()))
                .collect(),
            cluster: Generations::default(),
            stats: PollerStats::default(),
        };
        (poller, completions_rx)
    }

    pub fn history(&self, category: Category) -> Option<&History> {
        self.categories.get(&category).map(|s| &s.history)
    }

    pub fn stats(&self) -> PollerStats {
        self.stats
    }

    /// Stamps a new generation for `category` without fetching.
    pub fn issue(&mut self, category: Category) -> u64 {
        self.categories
            .entry(category)
            .or_default()
            .generations
            .issue()
    }

    pub fn issue_cluster(&mut self) -> u64 {
        self.cluster.issue()
    }

    /// One poll tick: a fetch per category (and the cluster stream), all in flight concurrently.
    /// Histories are first trimmed to the live window, so a shrink applies even if no fetch succeeds.
    pub fn poll_tick(&mut self) {
        let window = self.controls.window();
        for state in self.categories.values_mut() {
            state.history.trim(window);
        }
        for category in Category::ALL {
            self.spawn_fetch(category);
        }
        if self.config.cluster_enabled {
            self.spawn_cluster_fetch();
        }
    }

    fn spawn_fetch(&mut self, category: Category) {
        let generation = self.issue(category);
        let source = self.source.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch(category).await;
            let _ = tx
                .send(Completion::Category {
                    category,
                    generation,
                    result,
                })
                .await;
        });
    }

    fn spawn_cluster_fetch(&mut self) {
        let generation = self.issue_cluster();
        let seconds_since = self.controls.seconds_since();
        let source = self.source.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_cluster(seconds_since).await;
            let _ = tx
                .send(Completion::Cluster {
                    generation,
                    seconds_since,
                    result,
                })
                .await;
        });
    }

    pub fn apply(&mut self, completion: Completion) -> ApplyOutcome {
        let outcome = match completion {
            Completion::Category {
                category,
                generation,
                result,
            } => self.apply_snapshot(category, generation, result),
            Completion::Cluster {
                generation,
                seconds_since,
                result,
            } => self.apply_cluster(generation, seconds_since, result),
        };
        match outcome {
            ApplyOutcome::Applied => self.stats.applied += 1,
            ApplyOutcome::Stale => self.stats.stale += 1,
            ApplyOutcome::Failed => self.stats.failed += 1,
            ApplyOutcome::Empty => self.stats.empty += 1,
        }
        outcome
    }

    fn apply_snapshot(
        &mut self,
        category: Category,
        generation: u64,
        result: Result<Snapshot, FetchError>,
    ) -> ApplyOutcome {
        let window = self.controls.window();
        let options = SeriesOptions {
            window,
            metric: self.config.metric(category),
            filter_all_zero: self.config.filter_all_zero,
        };
        let state = self.categories.entry(category).or_default();

        if !state.generations.accepts(generation) {
            tracing::debug!(
                operation = "apply_snapshot",
                category = %category,
                generation,
                "Discarding stale fetch result"
            );
            return ApplyOutcome::Stale;
        }

        let snapshot = match result {
            Ok(s) => s,
            Err(e) => {
                if state.generations.should_warn() {
                    tracing::warn!(
                        error = %e,
                        operation = "fetch_snapshot",
                        category = %category,
                        "Snapshot fetch failed; skipping tick"
                    );
                } else {
                    tracing::debug!(error = %e, category = %category, "Snapshot fetch failed");
                }
                return ApplyOutcome::Failed;
            }
        };
        // An empty answer is still the newest answer; older fetches still in flight are stale.
        state.generations.mark_applied(generation);
        if snapshot.is_empty() {
            tracing::debug!(category = %category, generation, "Empty snapshot; nothing to chart");
            return ApplyOutcome::Empty;
        }

        let evicted = state.history.push(snapshot, window);
        let frame = series::build_frame(category, &state.history, &options, generation);
        tracing::debug!(
            category = %category,
            generation,
            ticks = state.history.len(),
            evicted,
            series = frame.series.len(),
            "Snapshot applied"
        );
        self.publish_chart(frame);
        ApplyOutcome::Applied
    }

    fn apply_cluster(
        &mut self,
        generation: u64,
        seconds_since: u64,
        result: Result<Vec<ClusterStat>, FetchError>,
    ) -> ApplyOutcome {
        if !self.cluster.accepts(generation) {
            tracing::debug!(generation, "Discarding stale cluster result");
            return ApplyOutcome::Stale;
        }
        let stats = match result {
            Ok(s) => s,
            Err(e) => {
                if self.cluster.should_warn() {
                    tracing::warn!(
                        error = %e,
                        operation = "fetch_cluster",
                        "Cluster stats fetch failed; skipping tick"
                    );
                }
                return ApplyOutcome::Failed;
            }
        };
        self.cluster.mark_applied(generation);
        if stats.is_empty() {
            return ApplyOutcome::Empty;
        }
        let frame = cluster_frame(&stats, generation, seconds_since);
        self.board_tx.send_modify(|board| board.cluster = Some(frame.clone()));
        let _ = self.updates_tx.send(FrameUpdate::Cluster(frame));
        ApplyOutcome::Applied
    }

    /// Clears the category's history, publishes the emptied chart, and makes every fetch issued
    /// so far stale.
    pub fn reset(&mut self, category: Category) {
        let options = SeriesOptions {
            window: self.controls.window(),
            metric: self.config.metric(category),
            filter_all_zero: self.config.filter_all_zero,
        };
        let state = self.categories.entry(category).or_default();
        state.history.reset();
        state.generations.reset();
        let frame = series::build_frame(
            category,
            &state.history,
            &options,
            state.generations.applied,
        );
        tracing::info!(category = %category, "History reset");
        self.publish_chart(frame);
    }

    fn handle_command(&mut self, command: PollerCommand) {
        match command {
            PollerCommand::Reset(category) => {
                self.reset(category);
                self.spawn_fetch(category);
            }
        }
    }

    fn publish_chart(&self, frame: ChartFrame) {
        self.board_tx.send_modify(|board| {
            board.charts.insert(frame.category, frame.clone());
        });
        // No receivers just means no /ws/charts client is connected.
        let _ = self.updates_tx.send(FrameUpdate::Chart(frame));
    }
}

pub fn spawn<S: SnapshotSource>(
    deps: PollerDeps<S>,
    config: PollerConfig,
    mut command_rx: mpsc::Receiver<PollerCommand>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let interval_ms = config.interval_ms;
    let stats_log_interval = Duration::from_secs(config.stats_log_interval_secs);
    let (mut poller, mut completions_rx) = Poller::new(deps, config);

    let poller_span = tracing::span!(tracing::Level::DEBUG, "poller", interval_ms);
    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_millis(interval_ms));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(stats_log_interval);
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        poller.poll_tick();
                    }
                    Some(completion) = completions_rx.recv() => {
                        poller.apply(completion);
                    }
                    Some(command) = command_rx.recv() => {
                        poller.handle_command(command);
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Poller shutting down");
                        break;
                    }
                    _ = stats_log_tick.tick() => {
                        let stats = poller.stats();
                        tracing::info!(
                            window = poller.controls.window(),
                            jobs_ticks = poller.history(Category::Jobs).map_or(0, History::len),
                            nodes_ticks = poller.history(Category::Nodes).map_or(0, History::len),
                            applied_total = stats.applied,
                            failed_total = stats.failed,
                            stale_total = stats.stale,
                            empty_total = stats.empty,
                            "poller stats"
                        );
                    }
                }
            }
        }
        .instrument(poller_span),
    )
}
