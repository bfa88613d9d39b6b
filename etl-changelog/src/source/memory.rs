use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ErrorKind, EtlResult};
use crate::range::SnapshotRange;
use crate::snapshot::TableHistory;
use crate::source::ChangeSource;
use crate::types::{COMMIT_SNAPSHOT_ID_COLUMN_NAME, Cell, ChangeRecord, ChangelogSchema};
use crate::{bail, ensure};

#[derive(Debug)]
struct MemoryTable {
    schema: ChangelogSchema,
    history: TableHistory,
    /// Raw changes keyed by the snapshot that committed them.
    changes: HashMap<i64, Vec<ChangeRecord>>,
}

#[derive(Debug)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
}

/// In-memory change source for testing and development purposes.
///
/// [`MemoryChangeSource`] keeps the raw changes committed by each snapshot of a table. Reading
/// a range returns the changes of every snapshot in it, oldest first, with the change ordinal
/// set to the position of the snapshot within the range. When the schema has a
/// `_commit_snapshot_id` column it receives the id of the committing snapshot.
#[derive(Debug, Clone)]
pub struct MemoryChangeSource {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryChangeSource {
    /// Creates a new source without tables.
    pub fn new() -> Self {
        let inner = Inner {
            tables: HashMap::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Creates an empty table, replacing any table with the same name.
    pub async fn create_table(&self, table: impl Into<String>, schema: ChangelogSchema) {
        let mut inner = self.inner.lock().await;
        let table = table.into();

        info!(table = %table, columns = schema.len(), "creating table");

        inner.tables.insert(
            table,
            MemoryTable {
                schema,
                history: TableHistory::new(),
                changes: HashMap::new(),
            },
        );
    }

    /// Commits a new snapshot of `table` holding `changes`.
    ///
    /// Every change must be a raw `INSERT` or `DELETE` with one cell per schema column. The
    /// ordinal and commit snapshot cells are overwritten on read, so any value works for them.
    pub async fn commit(
        &self,
        table: &str,
        snapshot_id: i64,
        timestamp_ms: i64,
        changes: Vec<ChangeRecord>,
    ) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(memory_table) = inner.tables.get_mut(table) else {
            bail!(
                ErrorKind::MissingTable,
                "Table does not exist in the change source",
                format!("table `{table}`")
            );
        };

        ensure!(
            memory_table.history.snapshot(snapshot_id).is_none(),
            ErrorKind::InvalidState,
            "Snapshot was already committed",
            format!("snapshot {snapshot_id} of table `{table}`")
        );

        for change in &changes {
            ensure!(
                change.change_type.is_raw(),
                ErrorKind::InvalidData,
                "Raw changelog rows must be INSERT or DELETE",
                format!("received `{}`", change.change_type)
            );
            ensure!(
                change.row.len() == memory_table.schema.len(),
                ErrorKind::InvalidData,
                "Changelog row does not match the table schema",
                format!(
                    "expected {} values, received {}",
                    memory_table.schema.len(),
                    change.row.len()
                )
            );
        }

        info!(
            table,
            snapshot_id,
            rows = changes.len(),
            "committing snapshot"
        );

        memory_table.history.commit(snapshot_id, timestamp_ms);
        memory_table.changes.insert(snapshot_id, changes);

        Ok(())
    }

    async fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&MemoryTable) -> EtlResult<T>,
    ) -> EtlResult<T> {
        let inner = self.inner.lock().await;
        let Some(memory_table) = inner.tables.get(table) else {
            bail!(
                ErrorKind::MissingTable,
                "Table does not exist in the change source",
                format!("table `{table}`")
            );
        };

        f(memory_table)
    }
}

impl Default for MemoryChangeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSource for MemoryChangeSource {
    fn name() -> &'static str {
        "memory"
    }

    async fn schema(&self, table: &str) -> EtlResult<ChangelogSchema> {
        self.with_table(table, |memory_table| Ok(memory_table.schema.clone()))
            .await
    }

    async fn history(&self, table: &str) -> EtlResult<TableHistory> {
        self.with_table(table, |memory_table| Ok(memory_table.history.clone()))
            .await
    }

    async fn read_changes(&self, table: &str, range: &SnapshotRange) -> EtlResult<Vec<ChangeRecord>> {
        let range = *range;
        let records = self
            .with_table(table, |memory_table| read_range(memory_table, range))
            .await?;

        info!(table, rows = records.len(), ?range, "read raw changelog");

        Ok(records)
    }
}

fn read_range(memory_table: &MemoryTable, range: SnapshotRange) -> EtlResult<Vec<ChangeRecord>> {
    let SnapshotRange::Bounded {
        start_exclusive,
        end_inclusive,
    } = range
    else {
        return Ok(Vec::new());
    };

    let history = &memory_table.history;
    let end_inclusive = match end_inclusive {
        Some(snapshot_id) => snapshot_id,
        None => match history.current_snapshot() {
            Some(snapshot) => snapshot.snapshot_id,
            None => return Ok(Vec::new()),
        },
    };

    ensure!(
        history.snapshot(end_inclusive).is_some(),
        ErrorKind::ValidationError,
        "End snapshot does not exist",
        format!("snapshot {end_inclusive}")
    );
    if let Some(start_exclusive) = start_exclusive {
        ensure!(
            history.is_ancestor_of(end_inclusive, start_exclusive),
            ErrorKind::ValidationError,
            "Start snapshot is not an ancestor of the end snapshot",
            format!("start {start_exclusive}, end {end_inclusive}")
        );
    }

    let mut snapshot_ids: Vec<i64> = history
        .ancestors_of(end_inclusive)
        .map(|snapshot| snapshot.snapshot_id)
        .take_while(|&snapshot_id| Some(snapshot_id) != start_exclusive)
        .collect();
    snapshot_ids.reverse();

    let schema = &memory_table.schema;
    let ordinal_index = schema.change_ordinal_index();
    let commit_snapshot_index = schema.column_index(COMMIT_SNAPSHOT_ID_COLUMN_NAME);

    let mut records = Vec::new();
    for (ordinal, snapshot_id) in snapshot_ids.into_iter().enumerate() {
        let Some(changes) = memory_table.changes.get(&snapshot_id) else {
            continue;
        };

        for change in changes {
            let mut record = change.clone();
            let values = record.row.values_mut();
            if let Some(cell) = ordinal_index.and_then(|index| values.get_mut(index)) {
                *cell = Cell::I64(ordinal as i64);
            }
            if let Some(cell) = commit_snapshot_index.and_then(|index| values.get_mut(index)) {
                *cell = Cell::I64(snapshot_id);
            }
            records.push(record);
        }
    }

    Ok(records)
}
