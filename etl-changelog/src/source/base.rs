use std::future::Future;

use crate::error::EtlResult;
use crate::range::SnapshotRange;
use crate::snapshot::TableHistory;
use crate::types::{ChangeRecord, ChangelogSchema};

/// Trait for systems that can produce the raw changelog of a table.
///
/// [`ChangeSource`] implementations compute the row-level difference between snapshots of a
/// table. Every returned record must be tagged `INSERT` or `DELETE` and carry, at the schema's
/// change ordinal position, the sequence number of the snapshot it was committed in relative to
/// the start of the range.
pub trait ChangeSource {
    /// Returns the name of the source.
    fn name() -> &'static str;

    /// Returns the changelog schema of `table`.
    fn schema(&self, table: &str) -> impl Future<Output = EtlResult<ChangelogSchema>> + Send;

    /// Returns the snapshot history of `table`, used to resolve time ranges.
    fn history(&self, table: &str) -> impl Future<Output = EtlResult<TableHistory>> + Send;

    /// Reads the raw changes of `table` committed within `range`, oldest snapshot first.
    ///
    /// An empty range yields no records.
    fn read_changes(
        &self,
        table: &str,
        range: &SnapshotRange,
    ) -> impl Future<Output = EtlResult<Vec<ChangeRecord>>> + Send;
}
