#![allow(dead_code)]

use etl_changelog::source::memory::MemoryChangeSource;
use etl_changelog::types::{
    CHANGE_ORDINAL_COLUMN_NAME, Cell, ChangeRecord, ChangeType, ChangelogSchema, TableRow,
};

/// Name of the table most tests read from.
pub const ITEMS_TABLE: &str = "db.items";

/// Schema with an `id` identifier, a `data` payload and the change ordinal.
pub fn items_schema() -> ChangelogSchema {
    ChangelogSchema::new(["id", "data", CHANGE_ORDINAL_COLUMN_NAME])
}

/// Builds an `(id, data)` record without ordinal.
pub fn row(change_type: ChangeType, id: i64, data: &str) -> ChangeRecord {
    ChangeRecord::new(change_type, TableRow::new(vec![Cell::I64(id), Cell::from(data)]))
}

/// Builds an `(id, data, ordinal)` record matching [`items_schema`].
pub fn item(change_type: ChangeType, id: i64, data: &str, ordinal: i64) -> ChangeRecord {
    ChangeRecord::new(
        change_type,
        TableRow::new(vec![Cell::I64(id), Cell::from(data), Cell::I64(ordinal)]),
    )
}

/// Builds a committed `(id, data)` change for [`MemoryChangeSource::commit`].
pub fn change(change_type: ChangeType, id: i64, data: &str) -> ChangeRecord {
    item(change_type, id, data, 0)
}

/// Creates a source holding [`ITEMS_TABLE`] with three snapshots:
///
/// - snapshot 1 at 1000 inserts rows 1 and 2,
/// - snapshot 2 at 2000 rewrites row 1 unchanged and updates row 2 from `b` to `c`,
/// - snapshot 3 at 3000 deletes row 1 and inserts row 3.
pub async fn items_source() -> MemoryChangeSource {
    let source = MemoryChangeSource::new();
    source.create_table(ITEMS_TABLE, items_schema()).await;

    source
        .commit(
            ITEMS_TABLE,
            1,
            1000,
            vec![
                change(ChangeType::Insert, 1, "a"),
                change(ChangeType::Insert, 2, "b"),
            ],
        )
        .await
        .unwrap();
    source
        .commit(
            ITEMS_TABLE,
            2,
            2000,
            vec![
                change(ChangeType::Delete, 1, "a"),
                change(ChangeType::Insert, 1, "a"),
                change(ChangeType::Delete, 2, "b"),
                change(ChangeType::Insert, 2, "c"),
            ],
        )
        .await
        .unwrap();
    source
        .commit(
            ITEMS_TABLE,
            3,
            3000,
            vec![
                change(ChangeType::Delete, 1, "a"),
                change(ChangeType::Insert, 3, "d"),
            ],
        )
        .await
        .unwrap();

    source
}
