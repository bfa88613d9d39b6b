use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::types::{ChangeRecord, ChangeType, IdentifierColumns, TableRow};

/// Returns `true` if `before` and `after` are a `DELETE` followed by an `INSERT` of the same
/// logical row.
pub fn is_update_pair(
    identifier: &IdentifierColumns,
    before: &ChangeRecord,
    after: &ChangeRecord,
) -> bool {
    before.change_type == ChangeType::Delete
        && after.change_type == ChangeType::Insert
        && identifier.same_logical_row(&before.row, &after.row)
}

/// Returns `true` if two records are a carry-over pair.
///
/// A carry-over pair is a removal and re-addition of a row that is identical in every field
/// except the operation tag. Such pairs come from rewriting a data file without modifying the
/// row. The tags must be `DELETE`/`INSERT` or `UPDATE_PREIMAGE`/`UPDATE_POSTIMAGE`, in either
/// order. Identical fields imply identical identifier values, so no identifier is needed.
pub fn is_carry_over_pair(a: &ChangeRecord, b: &ChangeRecord) -> bool {
    let tags_pair = matches!(
        (a.change_type, b.change_type),
        (ChangeType::Delete, ChangeType::Insert)
            | (ChangeType::Insert, ChangeType::Delete)
            | (ChangeType::UpdatePreimage, ChangeType::UpdatePostimage)
            | (ChangeType::UpdatePostimage, ChangeType::UpdatePreimage)
    );

    tags_pair && a.row.same_values(&b.row)
}

/// Removes carry-over pairs from relabeled batch output.
///
/// Records are grouped by every field except the operation tag. A group of exactly two records
/// forming a carry-over pair is dropped, every other record is kept in its original order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CarryOverFilter;

impl CarryOverFilter {
    /// Creates a new [`CarryOverFilter`].
    pub fn new() -> Self {
        Self
    }

    /// Returns `records` without carry-over pairs.
    pub fn apply(&self, records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
        retain_non_carry_overs(records, |record| record)
    }
}

/// Drops carry-over pairs from `items`, reading each item's record through `record`.
pub(crate) fn retain_non_carry_overs<T, F>(items: Vec<T>, record: F) -> Vec<T>
where
    F: Fn(&T) -> &ChangeRecord,
{
    let dropped: HashSet<usize> = {
        let mut groups: HashMap<RowValues<'_>, Vec<usize>> = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            groups
                .entry(RowValues(&record(item).row))
                .or_default()
                .push(index);
        }

        groups
            .into_values()
            .filter_map(|indices| match indices.as_slice() {
                [a, b] if is_carry_over_pair(record(&items[*a]), record(&items[*b])) => {
                    Some([*a, *b])
                }
                _ => None,
            })
            .flatten()
            .collect()
    };

    if dropped.is_empty() {
        return items;
    }

    debug!(dropped = dropped.len(), "removed carry-over rows");

    items
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !dropped.contains(index))
        .map(|(_, item)| item)
        .collect()
}

/// Borrowed row that groups by value in hash maps.
struct RowValues<'a>(&'a TableRow);

impl PartialEq for RowValues<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.same_values(other.0)
    }
}

impl Eq for RowValues<'_> {}

impl Hash for RowValues<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_values(state);
    }
}
