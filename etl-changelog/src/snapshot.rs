//! Snapshot lineage of a table.

use std::collections::HashMap;
use std::iter;

/// A committed state of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub snapshot_id: i64,
    /// The snapshot this one was committed on top of, [`None`] for the first snapshot.
    pub parent_id: Option<i64>,
    /// Commit time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl Snapshot {
    /// Creates a new snapshot.
    pub fn new(snapshot_id: i64, parent_id: Option<i64>, timestamp_ms: i64) -> Self {
        Self {
            snapshot_id,
            parent_id,
            timestamp_ms,
        }
    }
}

/// The snapshots of a table and which one is current.
///
/// Snapshots form a tree through their parent ids. The history of the table is the chain of
/// ancestors of the current snapshot. A parent id pointing to a snapshot that is no longer
/// known ends the chain, as happens after old snapshots were expired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableHistory {
    snapshots: HashMap<i64, Snapshot>,
    current_snapshot_id: Option<i64>,
}

impl TableHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history from known snapshots and the current snapshot id.
    pub fn from_snapshots(
        snapshots: impl IntoIterator<Item = Snapshot>,
        current_snapshot_id: Option<i64>,
    ) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|snapshot| (snapshot.snapshot_id, snapshot))
                .collect(),
            current_snapshot_id,
        }
    }

    /// Commits a new snapshot on top of the current one and makes it current.
    pub fn commit(&mut self, snapshot_id: i64, timestamp_ms: i64) -> Snapshot {
        let snapshot = Snapshot::new(snapshot_id, self.current_snapshot_id, timestamp_ms);
        self.snapshots.insert(snapshot_id, snapshot);
        self.current_snapshot_id = Some(snapshot_id);

        snapshot
    }

    /// Returns a snapshot by id.
    pub fn snapshot(&self, snapshot_id: i64) -> Option<&Snapshot> {
        self.snapshots.get(&snapshot_id)
    }

    /// Returns the current snapshot, [`None`] for a table without commits.
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.current_snapshot_id
            .and_then(|snapshot_id| self.snapshot(snapshot_id))
    }

    /// Returns `snapshot_id` and its known ancestors, newest first.
    pub fn ancestors_of(&self, snapshot_id: i64) -> impl Iterator<Item = &Snapshot> {
        iter::successors(self.snapshot(snapshot_id), |snapshot| {
            snapshot
                .parent_id
                .and_then(|parent_id| self.snapshot(parent_id))
        })
    }

    /// Returns the current snapshot and its known ancestors, newest first.
    pub fn current_ancestors(&self) -> impl Iterator<Item = &Snapshot> {
        self.current_snapshot_id
            .into_iter()
            .flat_map(|snapshot_id| self.ancestors_of(snapshot_id))
    }

    /// Returns `true` if `ancestor_id` is `snapshot_id` or one of its known ancestors.
    pub fn is_ancestor_of(&self, snapshot_id: i64, ancestor_id: i64) -> bool {
        self.ancestors_of(snapshot_id)
            .any(|snapshot| snapshot.snapshot_id == ancestor_id)
    }

    /// Returns the oldest known ancestor of the current snapshot.
    pub fn oldest_ancestor(&self) -> Option<&Snapshot> {
        self.current_ancestors().last()
    }

    /// Returns the oldest ancestor of the current snapshot committed at or after `timestamp_ms`.
    ///
    /// A snapshot committed exactly at `timestamp_ms` is returned as is. When the walk reaches
    /// the first snapshot of the table, that snapshot is returned. When the known history ends
    /// before reaching a snapshot older than `timestamp_ms`, the answer cannot be known and
    /// [`None`] is returned.
    pub fn oldest_ancestor_after(&self, timestamp_ms: i64) -> Option<&Snapshot> {
        let mut last: Option<&Snapshot> = None;
        for snapshot in self.current_ancestors() {
            if snapshot.timestamp_ms < timestamp_ms {
                return last;
            }
            if snapshot.timestamp_ms == timestamp_ms {
                return Some(snapshot);
            }
            last = Some(snapshot);
        }

        last.filter(|snapshot| snapshot.parent_id.is_none())
    }

    /// Returns the newest ancestor of the current snapshot committed at or before `timestamp_ms`.
    pub fn snapshot_as_of_time(&self, timestamp_ms: i64) -> Option<&Snapshot> {
        self.current_ancestors()
            .find(|snapshot| snapshot.timestamp_ms <= timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Snapshots 1, 2, 3 committed at 100, 200, 300.
    fn history() -> TableHistory {
        let mut history = TableHistory::new();
        history.commit(1, 100);
        history.commit(2, 200);
        history.commit(3, 300);
        history
    }

    fn ids<'a>(snapshots: impl Iterator<Item = &'a Snapshot>) -> Vec<i64> {
        snapshots.map(|snapshot| snapshot.snapshot_id).collect()
    }

    #[test]
    fn ancestors_are_newest_first() {
        let history = history();

        assert_eq!(ids(history.current_ancestors()), vec![3, 2, 1]);
        assert_eq!(ids(history.ancestors_of(2)), vec![2, 1]);
        assert_eq!(history.oldest_ancestor().map(|s| s.snapshot_id), Some(1));
        assert!(history.is_ancestor_of(3, 1));
        assert!(!history.is_ancestor_of(1, 3));
    }

    #[test]
    fn oldest_ancestor_after_picks_first_snapshot_at_or_after() {
        let history = history();

        assert_eq!(history.oldest_ancestor_after(150).map(|s| s.snapshot_id), Some(2));
        assert_eq!(history.oldest_ancestor_after(200).map(|s| s.snapshot_id), Some(2));
        assert_eq!(history.oldest_ancestor_after(50).map(|s| s.snapshot_id), Some(1));
        assert_eq!(history.oldest_ancestor_after(301), None);
    }

    #[test]
    fn oldest_ancestor_after_is_unknown_for_expired_history() {
        let history = TableHistory::from_snapshots(
            [Snapshot::new(2, Some(1), 200), Snapshot::new(3, Some(2), 300)],
            Some(3),
        );

        assert_eq!(history.oldest_ancestor_after(50), None);
        assert_eq!(history.oldest_ancestor().map(|s| s.snapshot_id), Some(2));
    }

    #[test]
    fn snapshot_as_of_time_picks_newest_at_or_before() {
        let history = history();

        assert_eq!(history.snapshot_as_of_time(250).map(|s| s.snapshot_id), Some(2));
        assert_eq!(history.snapshot_as_of_time(300).map(|s| s.snapshot_id), Some(3));
        assert_eq!(history.snapshot_as_of_time(99), None);
    }

    #[test]
    fn empty_history_has_no_snapshots() {
        let history = TableHistory::new();

        assert!(history.current_snapshot().is_none());
        assert!(history.oldest_ancestor().is_none());
        assert!(history.oldest_ancestor_after(0).is_none());
    }
}
