use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorKind, EtlError};
use crate::etl_error;
use crate::types::{Cell, TableRow};

const INSERT: &str = "INSERT";
const DELETE: &str = "DELETE";
const UPDATE_BEFORE: &str = "UPDATE_BEFORE";
const UPDATE_AFTER: &str = "UPDATE_AFTER";
const UPDATE_PREIMAGE: &str = "UPDATE_PREIMAGE";
const UPDATE_POSTIMAGE: &str = "UPDATE_POSTIMAGE";

/// Operation tag of a changelog row.
///
/// Raw rows produced by a diff source are either [`ChangeType::Insert`] or
/// [`ChangeType::Delete`]. The streaming normalizer extends the domain with
/// [`ChangeType::UpdateBefore`] and [`ChangeType::UpdateAfter`], the batch normalizer with
/// [`ChangeType::UpdatePreimage`] and [`ChangeType::UpdatePostimage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Insert,
    Delete,
    UpdateBefore,
    UpdateAfter,
    UpdatePreimage,
    UpdatePostimage,
}

impl ChangeType {
    /// Returns the canonical upper-case name of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Insert => INSERT,
            ChangeType::Delete => DELETE,
            ChangeType::UpdateBefore => UPDATE_BEFORE,
            ChangeType::UpdateAfter => UPDATE_AFTER,
            ChangeType::UpdatePreimage => UPDATE_PREIMAGE,
            ChangeType::UpdatePostimage => UPDATE_POSTIMAGE,
        }
    }

    /// Returns `true` for the tags a diff source may produce.
    pub fn is_raw(&self) -> bool {
        matches!(self, ChangeType::Insert | ChangeType::Delete)
    }

    /// Returns `true` for any of the four update tags.
    pub fn is_update(&self) -> bool {
        !self.is_raw()
    }

    /// Parses a tag as produced by a diff source, rejecting update tags.
    pub fn parse_raw(value: &str) -> Result<ChangeType, EtlError> {
        let change_type = value.parse::<ChangeType>()?;
        if !change_type.is_raw() {
            return Err(etl_error!(
                ErrorKind::InvalidData,
                "Raw changelog rows must be INSERT or DELETE",
                format!("received `{value}`")
            ));
        }

        Ok(change_type)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            INSERT => Ok(ChangeType::Insert),
            DELETE => Ok(ChangeType::Delete),
            UPDATE_BEFORE => Ok(ChangeType::UpdateBefore),
            UPDATE_AFTER => Ok(ChangeType::UpdateAfter),
            UPDATE_PREIMAGE => Ok(ChangeType::UpdatePreimage),
            UPDATE_POSTIMAGE => Ok(ChangeType::UpdatePostimage),
            other => Err(etl_error!(
                ErrorKind::InvalidData,
                "Unknown change type",
                format!("received `{other}`")
            )),
        }
    }
}

/// A single row of a changelog.
///
/// [`ChangeRecord`] pairs the data fields of a row with its operation tag. The tag is kept
/// apart from the data so that "every field except the tag" is simply [`ChangeRecord::row`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Operation tag of this row.
    pub change_type: ChangeType,
    /// Data fields in schema column order.
    pub row: TableRow,
}

impl ChangeRecord {
    /// Creates a new change record.
    pub fn new(change_type: ChangeType, row: TableRow) -> Self {
        Self { change_type, row }
    }

    /// Creates a record tagged [`ChangeType::Insert`].
    pub fn insert(values: Vec<Cell>) -> Self {
        Self::new(ChangeType::Insert, TableRow::new(values))
    }

    /// Creates a record tagged [`ChangeType::Delete`].
    pub fn delete(values: Vec<Cell>) -> Self {
        Self::new(ChangeType::Delete, TableRow::new(values))
    }

    /// Returns the same record with its tag replaced.
    pub fn relabel(mut self, change_type: ChangeType) -> Self {
        self.change_type = change_type;
        self
    }

    /// Returns the data fields of the record.
    pub fn values(&self) -> &[Cell] {
        self.row.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_type_names_round_trip() {
        for change_type in [
            ChangeType::Insert,
            ChangeType::Delete,
            ChangeType::UpdateBefore,
            ChangeType::UpdateAfter,
            ChangeType::UpdatePreimage,
            ChangeType::UpdatePostimage,
        ] {
            assert_eq!(change_type.as_str().parse::<ChangeType>().unwrap(), change_type);
        }
    }

    #[test]
    fn delete_sorts_before_insert_by_name() {
        assert!(ChangeType::Delete.as_str() < ChangeType::Insert.as_str());
    }

    #[test]
    fn parse_raw_rejects_update_tags() {
        assert_eq!(ChangeType::parse_raw("DELETE").unwrap(), ChangeType::Delete);

        let err = ChangeType::parse_raw("UPDATE_AFTER").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let err = ChangeType::parse_raw("upsert").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.detail(), Some("received `upsert`"));
    }

    #[test]
    fn relabel_keeps_fields() {
        let record = ChangeRecord::delete(vec![Cell::I64(1), Cell::from("a")]);
        let relabeled = record.clone().relabel(ChangeType::UpdateBefore);

        assert_eq!(relabeled.change_type, ChangeType::UpdateBefore);
        assert_eq!(relabeled.row, record.row);
    }
}
