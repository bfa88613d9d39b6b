use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::EtlResult;
use crate::normalize::ChangelogNormalizer;
use crate::normalize::carry_over::retain_non_carry_overs;
use crate::types::{
    Cell, ChangeRecord, ChangeType, ChangelogSchema, IdentifierColumns, IdentifierKey, TableRow,
};

/// Size of a partition that holds exactly one update pair.
const PAIR_SIZE: usize = 2;

/// A record together with its window bookkeeping.
///
/// The bookkeeping never becomes part of the record, so output rows have exactly the input
/// schema.
#[derive(Debug)]
struct WindowedRow {
    /// Position of the record in the input.
    position: usize,
    /// 1-based rank of the record inside its partition, ordered by tag name.
    rank: usize,
    /// Number of records in the partition.
    count: usize,
    record: ChangeRecord,
}

/// Changelog normalizer that pairs records by identifier and change ordinal.
///
/// Records are partitioned by identifier values and change ordinal, then ordered inside each
/// partition by tag name so that `DELETE` ranks before `INSERT`. A partition holding exactly two
/// records becomes an `UPDATE_PREIMAGE`/`UPDATE_POSTIMAGE` pair, and the pair is dropped when
/// both halves are identical in every field. Larger and single-record partitions pass through
/// unchanged. Output keeps the input order of surviving records.
#[derive(Debug, Clone)]
pub struct BatchNormalizer {
    identifier: IdentifierColumns,
    ordinal_index: usize,
}

impl BatchNormalizer {
    /// Creates a new [`BatchNormalizer`] reading the change ordinal at `ordinal_index`.
    pub fn new(identifier: IdentifierColumns, ordinal_index: usize) -> Self {
        Self {
            identifier,
            ordinal_index,
        }
    }

    /// Creates a [`BatchNormalizer`] by resolving column names against `schema`.
    ///
    /// Fails when an identifier column is missing or the schema has no change ordinal column.
    pub fn from_schema<S: AsRef<str>>(
        schema: &ChangelogSchema,
        identifier_columns: &[S],
    ) -> EtlResult<Self> {
        let identifier = schema.identifier_columns(identifier_columns)?;
        let ordinal_index = schema.require_change_ordinal_index()?;

        Ok(Self::new(identifier, ordinal_index))
    }

    /// Returns the identifier columns used to pair records.
    pub fn identifier(&self) -> &IdentifierColumns {
        &self.identifier
    }

    /// Returns the position of the change ordinal column.
    pub fn ordinal_index(&self) -> usize {
        self.ordinal_index
    }

    fn partition_key(&self, row: &TableRow) -> IdentifierKey {
        let mut values = self.identifier.key(row).into_values();
        values.push(row.get(self.ordinal_index).cloned().unwrap_or(Cell::Null));

        IdentifierKey::new(values)
    }
}

impl ChangelogNormalizer for BatchNormalizer {
    fn normalize(&self, records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
        let input = records.len();

        let mut partitions: HashMap<IdentifierKey, Vec<(usize, ChangeRecord)>> = HashMap::new();
        for (position, record) in records.into_iter().enumerate() {
            partitions
                .entry(self.partition_key(&record.row))
                .or_default()
                .push((position, record));
        }

        let partition_count = partitions.len();
        let oversized = partitions
            .values()
            .filter(|partition| partition.len() > PAIR_SIZE)
            .count();
        if oversized > 0 {
            warn!(
                oversized,
                "changelog partitions with more than two rows are passed through unchanged"
            );
        }

        #[cfg(feature = "parallel")]
        let windowed: Vec<WindowedRow> = partitions
            .into_par_iter()
            .flat_map_iter(|(_, partition)| window_partition(partition))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let windowed: Vec<WindowedRow> = partitions
            .into_iter()
            .flat_map(|(_, partition)| window_partition(partition))
            .collect();

        let (relabeled, mut output): (Vec<WindowedRow>, Vec<WindowedRow>) = windowed
            .into_iter()
            .partition(|row| row.record.change_type.is_update());

        let pairs = relabeled.len() / PAIR_SIZE;
        let kept = retain_non_carry_overs(relabeled, |row| &row.record);
        let carry_overs = pairs - kept.len() / PAIR_SIZE;

        output.extend(kept);
        output.sort_unstable_by_key(|row| row.position);

        debug!(
            input,
            output = output.len(),
            partitions = partition_count,
            updates = pairs - carry_overs,
            carry_overs,
            "normalized changelog batch"
        );

        output.into_iter().map(|row| row.record).collect()
    }
}

/// Orders a partition by tag name, attaches rank and count, and relabels a two-record partition.
fn window_partition(mut partition: Vec<(usize, ChangeRecord)>) -> Vec<WindowedRow> {
    partition.sort_by(|(a_position, a), (b_position, b)| {
        a.change_type
            .as_str()
            .cmp(b.change_type.as_str())
            .then(a_position.cmp(b_position))
    });

    let count = partition.len();
    let mut rows: Vec<WindowedRow> = partition
        .into_iter()
        .enumerate()
        .map(|(index, (position, record))| WindowedRow {
            position,
            rank: index + 1,
            count,
            record,
        })
        .collect();

    relabel_pair(&mut rows);

    rows
}

/// Relabels a partition of exactly two records as an image pair.
///
/// The record ranked first by tag name becomes the pre-image, the other the post-image.
/// Partitions of any other size are left untouched.
fn relabel_pair(rows: &mut [WindowedRow]) {
    for row in rows.iter_mut().filter(|row| row.count == PAIR_SIZE) {
        row.record.change_type = if row.rank == 1 {
            ChangeType::UpdatePreimage
        } else {
            ChangeType::UpdatePostimage
        };
    }
}
