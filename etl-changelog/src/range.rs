//! Resolution of the snapshot range a changelog is read from.

use tracing::debug;

use crate::ensure;
use crate::error::{ErrorKind, EtlResult};
use crate::snapshot::TableHistory;

/// Which part of a table's history to read changes from.
///
/// Timestamps take precedence: when either timestamp is set, the snapshot ids are ignored and
/// the range is derived from the table history instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeRangeRequest {
    pub start_snapshot_id_exclusive: Option<i64>,
    pub end_snapshot_id_inclusive: Option<i64>,
    /// Milliseconds since the Unix epoch.
    pub start_timestamp_ms: Option<i64>,
    /// Milliseconds since the Unix epoch.
    pub end_timestamp_ms: Option<i64>,
}

impl ChangeRangeRequest {
    /// Returns `true` if the range is expressed through timestamps.
    pub fn uses_timestamps(&self) -> bool {
        self.start_timestamp_ms.is_some() || self.end_timestamp_ms.is_some()
    }
}

/// A resolved range of snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotRange {
    /// No snapshot matches the request, so there are no changes to read.
    Empty,
    /// Changes committed after `start_exclusive` up to and including `end_inclusive`.
    ///
    /// A missing start reads from the first snapshot of the table, a missing end reads up to
    /// the current snapshot.
    Bounded {
        start_exclusive: Option<i64>,
        end_inclusive: Option<i64>,
    },
}

impl SnapshotRange {
    /// Returns the range covering the whole history of a table.
    pub fn all() -> Self {
        SnapshotRange::Bounded {
            start_exclusive: None,
            end_inclusive: None,
        }
    }

    /// Returns `true` if the range can hold no changes.
    pub fn is_empty(&self) -> bool {
        matches!(self, SnapshotRange::Empty)
    }
}

/// Resolves a [`ChangeRangeRequest`] against a table history.
///
/// Without timestamps the requested snapshot ids are used as given. Otherwise the start is the
/// oldest ancestor committed at or after the start timestamp and the end is the newest
/// ancestor committed at or before the end timestamp, defaulting to the oldest ancestor and
/// the current snapshot. The range starts after the parent of the start snapshot so that the
/// start snapshot's own changes are included.
///
/// Fails with [`ErrorKind::ValidationError`] when the start timestamp is after the end
/// timestamp. Returns [`SnapshotRange::Empty`] when either end cannot be matched.
pub fn resolve_snapshot_range(
    history: &TableHistory,
    request: &ChangeRangeRequest,
) -> EtlResult<SnapshotRange> {
    if !request.uses_timestamps() {
        return Ok(SnapshotRange::Bounded {
            start_exclusive: request.start_snapshot_id_exclusive,
            end_inclusive: request.end_snapshot_id_inclusive,
        });
    }

    if let (Some(start), Some(end)) = (request.start_timestamp_ms, request.end_timestamp_ms) {
        ensure!(
            start <= end,
            ErrorKind::ValidationError,
            "Start timestamp must be less than or equal to end timestamp",
            format!("start {start} is after end {end}")
        );
    }

    let start = match request.start_timestamp_ms {
        Some(timestamp_ms) => history.oldest_ancestor_after(timestamp_ms),
        None => history.oldest_ancestor(),
    };
    let end = match request.end_timestamp_ms {
        Some(timestamp_ms) => history.snapshot_as_of_time(timestamp_ms),
        None => history.current_snapshot(),
    };

    let (Some(start), Some(end)) = (start, end) else {
        debug!(
            start_timestamp_ms = request.start_timestamp_ms,
            end_timestamp_ms = request.end_timestamp_ms,
            "no snapshot matches the requested time range"
        );
        return Ok(SnapshotRange::Empty);
    };

    Ok(SnapshotRange::Bounded {
        start_exclusive: start.parent_id,
        end_inclusive: Some(end.snapshot_id),
    })
}
