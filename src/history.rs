// Bounded per-category snapshot history. Index 0 is the oldest retained snapshot.

use crate::models::Snapshot;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot and evict from the front until `len <= window`.
    /// Returns the number of evicted snapshots.
    pub fn push(&mut self, snapshot: Snapshot, window: usize) -> usize {
        self.snapshots.push_back(snapshot);
        self.trim(window)
    }

    /// Drop oldest snapshots until `len <= window`. Also applies retroactively when the window
    /// shrank since the last push.
    pub fn trim(&mut self, window: usize) -> usize {
        let excess = self.snapshots.len().saturating_sub(window);
        self.snapshots.drain(..excess);
        excess
    }

    pub fn reset(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// The most recent `n` snapshots, oldest first.
    pub fn recent(&self, n: usize) -> impl ExactSizeIterator<Item = &Snapshot> {
        let skip = self.snapshots.len().saturating_sub(n);
        self.snapshots.range(skip..)
    }
}

impl FromIterator<Snapshot> for History {
    fn from_iter<I: IntoIterator<Item = Snapshot>>(iter: I) -> Self {
        Self {
            snapshots: iter.into_iter().collect(),
        }
    }
}
