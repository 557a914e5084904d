//! Change aggregation: coalesces raw watcher events into one pending change
//! set per project, debounced across a quiescence window.
//!
//! Only timing and per-path event algebra live here. Classification and
//! build policy are elsewhere.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use tokio::time::{Duration, Instant};

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// One build cycle's worth of coalesced changes.
///
/// A path appears in at most one bucket. Consumed exactly once per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// All paths in added, modified, removed order (the wire-command order).
    pub fn union(&self) -> Vec<PathBuf> {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.removed)
            .cloned()
            .collect()
    }

    pub fn iter_with_kind(&self) -> impl Iterator<Item = (&PathBuf, ChangeKind)> {
        self.added
            .iter()
            .map(|p| (p, ChangeKind::Added))
            .chain(self.modified.iter().map(|p| (p, ChangeKind::Modified)))
            .chain(self.removed.iter().map(|p| (p, ChangeKind::Removed)))
    }

    /// Fold another change set into this one (same per-path algebra as the
    /// aggregator). Used when a cycle's dispatch must wait behind a busy
    /// service: the deferred set subsumes every request merged into it.
    pub fn merge(&mut self, newer: ChangeSet) {
        let mut map: FxHashMap<PathBuf, ChangeKind> = FxHashMap::default();
        for (path, kind) in self.iter_with_kind() {
            map.insert(path.clone(), kind);
        }
        for (path, kind) in newer.iter_with_kind() {
            merge_event(&mut map, path.clone(), kind, kind != ChangeKind::Added);
        }
        *self = changes_from_map(map);
    }
}

/// Per-path event algebra shared by the aggregator and `ChangeSet::merge`.
///
/// `previously_tracked` answers "did this path exist before the burst"; it
/// decides whether a removal nets out to nothing and whether a re-appearing
/// path is a restore (content change) or genuinely new.
fn merge_event(
    map: &mut FxHashMap<PathBuf, ChangeKind>,
    path: PathBuf,
    kind: ChangeKind,
    previously_tracked: bool,
) {
    use ChangeKind::{Added, Modified, Removed};

    // The watcher reports atomic saves of tracked files as Added.
    let kind = if kind == Added && previously_tracked {
        Modified
    } else {
        kind
    };

    let Some(&existing) = map.get(&path) else {
        // Removal of a path that was never tracked and never appeared in
        // this burst is noise.
        if kind == Removed && !previously_tracked {
            return;
        }
        map.insert(path, kind);
        return;
    };

    match (existing, kind) {
        // Still a brand-new file, whatever happened to it since.
        (Added, Modified) => {}
        // Appeared then vanished within one window: no net change.
        (Added, Removed) => {
            map.remove(&path);
        }
        (Modified, Removed) => {
            map.insert(path, Removed);
        }
        // Deleted then restored: net effect depends on prior existence.
        (Removed, Added | Modified) => {
            let kind = if previously_tracked { Modified } else { Added };
            map.insert(path, kind);
        }
        // Same kind or remaining combinations: most recent event wins.
        _ => {
            map.insert(path, kind);
        }
    }
}

fn changes_from_map(map: FxHashMap<PathBuf, ChangeKind>) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for (path, kind) in map {
        match kind {
            ChangeKind::Added => changes.added.push(path),
            ChangeKind::Modified => changes.modified.push(path),
            ChangeKind::Removed => changes.removed.push(path),
        }
    }
    changes
}

/// Accumulates watcher events for one project and owns its debounce deadline.
///
/// Every `record` (re)arms the single quiescence deadline; only deadline
/// expiry should drain, so each edit burst produces at most one build.
pub struct ChangeAggregator {
    changes: FxHashMap<PathBuf, ChangeKind>,
    deadline: Option<Instant>,
    window: Duration,
}

impl ChangeAggregator {
    pub fn new(window: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            deadline: None,
            window,
        }
    }

    /// Record one watcher event, coalescing per the tie-break rules, and
    /// restart the quiescence window.
    pub fn record(&mut self, path: PathBuf, kind: ChangeKind, previously_tracked: bool) {
        crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
        merge_event(&mut self.changes, path, kind, previously_tracked);
        self.arm();
    }

    /// Arm the deadline without recording an event (externally requested
    /// cycle latching onto the debounce path).
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Re-absorb a change set whose dispatch failed, WITHOUT arming the
    /// deadline: retry happens on the next event or request, never
    /// spontaneously.
    pub fn reabsorb(&mut self, changes: ChangeSet) {
        for (path, kind) in changes.iter_with_kind() {
            merge_event(&mut self.changes, path.clone(), kind, kind != ChangeKind::Added);
        }
    }

    /// The instant the pending window expires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    pub fn has_events(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Take the pending change set and disarm the deadline, atomically with
    /// the read. `None` when the burst netted out to nothing.
    pub fn drain(&mut self) -> Option<ChangeSet> {
        self.deadline = None;
        if self.changes.is_empty() {
            return None;
        }
        let map = std::mem::take(&mut self.changes);
        Some(changes_from_map(map))
    }
}
