use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

/// A single typed value stored in a changelog row.
///
/// [`Cell`] is a closed set of the primitive kinds a changelog row can carry. Absent values are
/// represented by [`Cell::Null`] and never by a missing cell, so every row has the same arity as
/// its schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    String(String),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Cell {
    /// Returns `true` if the cell holds no value.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Compares two cells the way the normalizers compare fields.
    ///
    /// Two nulls are the same, a null is never the same as a value, and values of different
    /// kinds are never the same. Floats compare by bit pattern, so `NaN` matches `NaN` and `0.0`
    /// does not match `-0.0`. This is consistent with [`Cell::hash_value`].
    pub fn same_value(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::F32(a), Cell::F32(b)) => a.to_bits() == b.to_bits(),
            (Cell::F64(a), Cell::F64(b)) => a.to_bits() == b.to_bits(),
            (Cell::Null, _) | (_, Cell::Null) => false,
            (a, b) => a == b,
        }
    }

    /// Hashes a cell consistently with [`Cell::same_value`].
    pub fn hash_value<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);

        match self {
            Cell::Null => {}
            Cell::Bool(v) => v.hash(state),
            Cell::String(v) => v.hash(state),
            Cell::I16(v) => v.hash(state),
            Cell::I32(v) => v.hash(state),
            Cell::I64(v) => v.hash(state),
            Cell::F32(v) => v.to_bits().hash(state),
            Cell::F64(v) => v.to_bits().hash(state),
            Cell::Date(v) => v.hash(state),
            Cell::Time(v) => v.hash(state),
            Cell::Timestamp(v) => v.hash(state),
            Cell::TimestampTz(v) => v.hash(state),
            Cell::Uuid(v) => v.hash(state),
            Cell::Bytes(v) => v.hash(state),
            // Maps are ordered, so equal JSON values render identically.
            Cell::Json(v) => v.to_string().hash(state),
        }
    }

    /// Total order used when callers sort rows before streaming normalization.
    ///
    /// Nulls sort first, then cells are ordered by kind and finally by value. The order agrees
    /// with [`Cell::same_value`]: two cells compare equal exactly when they are the same value.
    pub fn sort_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Bool(a), Cell::Bool(b)) => a.cmp(b),
            (Cell::String(a), Cell::String(b)) => a.cmp(b),
            (Cell::I16(a), Cell::I16(b)) => a.cmp(b),
            (Cell::I32(a), Cell::I32(b)) => a.cmp(b),
            (Cell::I64(a), Cell::I64(b)) => a.cmp(b),
            (Cell::F32(a), Cell::F32(b)) => a.total_cmp(b),
            (Cell::F64(a), Cell::F64(b)) => a.total_cmp(b),
            (Cell::Date(a), Cell::Date(b)) => a.cmp(b),
            (Cell::Time(a), Cell::Time(b)) => a.cmp(b),
            (Cell::Timestamp(a), Cell::Timestamp(b)) => a.cmp(b),
            (Cell::TimestampTz(a), Cell::TimestampTz(b)) => a.cmp(b),
            (Cell::Uuid(a), Cell::Uuid(b)) => a.cmp(b),
            (Cell::Bytes(a), Cell::Bytes(b)) => a.cmp(b),
            (Cell::Json(a), Cell::Json(b)) => a.to_string().cmp(&b.to_string()),
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    /// Returns the cell as an `i64` when it holds any integer kind.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::I16(v) => Some(i64::from(*v)),
            Cell::I32(v) => Some(i64::from(*v)),
            Cell::I64(v) => Some(*v),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Cell::Null => 0,
            Cell::Bool(_) => 1,
            Cell::String(_) => 2,
            Cell::I16(_) => 3,
            Cell::I32(_) => 4,
            Cell::I64(_) => 5,
            Cell::F32(_) => 6,
            Cell::F64(_) => 7,
            Cell::Date(_) => 8,
            Cell::Time(_) => 9,
            Cell::Timestamp(_) => 10,
            Cell::TimestampTz(_) => 11,
            Cell::Uuid(_) => 12,
            Cell::Bytes(_) => 13,
            Cell::Json(_) => 14,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::I32(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::I64(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl<T> From<Option<T>> for Cell
where
    T: Into<Cell>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_cell(cell: &Cell) -> u64 {
        let mut hasher = DefaultHasher::new();
        cell.hash_value(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn nulls_are_the_same_value() {
        assert!(Cell::Null.same_value(&Cell::Null));
        assert!(!Cell::Null.same_value(&Cell::I64(0)));
        assert!(!Cell::String(String::new()).same_value(&Cell::Null));
    }

    #[test]
    fn different_kinds_are_never_the_same() {
        assert!(!Cell::I32(1).same_value(&Cell::I64(1)));
        assert_ne!(Cell::I32(1).sort_cmp(&Cell::I64(1)), Ordering::Equal);
    }

    #[test]
    fn floats_compare_by_bits() {
        assert!(Cell::F64(f64::NAN).same_value(&Cell::F64(f64::NAN)));
        assert!(!Cell::F64(0.0).same_value(&Cell::F64(-0.0)));
        assert_eq!(hash_cell(&Cell::F64(1.5)), hash_cell(&Cell::F64(1.5)));
        assert_eq!(
            Cell::F64(f64::NAN).sort_cmp(&Cell::F64(f64::NAN)),
            Ordering::Equal
        );
    }

    #[test]
    fn equal_json_values_hash_alike() {
        let a = Cell::Json(serde_json::json!({"b": 1, "a": [true, null]}));
        let b = Cell::Json(serde_json::json!({"a": [true, null], "b": 1}));

        assert!(a.same_value(&b));
        assert_eq!(hash_cell(&a), hash_cell(&b));
    }

    #[test]
    fn null_sorts_first() {
        assert_eq!(Cell::Null.sort_cmp(&Cell::Bool(false)), Ordering::Less);
        assert_eq!(Cell::I64(3).sort_cmp(&Cell::Null), Ordering::Greater);
        assert_eq!(Cell::I64(2).sort_cmp(&Cell::I64(10)), Ordering::Less);
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Cell::from(None::<i64>), Cell::Null);
        assert_eq!(Cell::from(Some("a")), Cell::String("a".to_string()));
    }
}
