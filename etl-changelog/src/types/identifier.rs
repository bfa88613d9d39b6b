//! Identity of logical rows across changelog operations.

use std::hash::{Hash, Hasher};

use crate::types::{Cell, TableRow};

/// Ordered row positions that together identify the same logical row.
///
/// An empty list means every row is its own identity: the whole row acts as the key, so only
/// rows that are equal in every field are considered the same logical row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifierColumns {
    positions: Vec<usize>,
}

impl IdentifierColumns {
    /// Creates identifier columns from row positions.
    pub fn new(positions: Vec<usize>) -> Self {
        Self { positions }
    }

    /// Identifier columns that treat every row as its own identity.
    pub fn whole_row() -> Self {
        Self::default()
    }

    /// Returns the identifier positions, empty for whole-row identity.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Returns `true` if both rows describe the same logical row.
    ///
    /// Comparison is null-aware. A position missing from either row never matches.
    pub fn same_logical_row(&self, a: &TableRow, b: &TableRow) -> bool {
        if self.positions.is_empty() {
            return a.same_values(b);
        }

        self.positions
            .iter()
            .all(|&index| match (a.get(index), b.get(index)) {
                (Some(a), Some(b)) => a.same_value(b),
                _ => false,
            })
    }

    /// Extracts the identifier key of a row.
    pub fn key(&self, row: &TableRow) -> IdentifierKey {
        if self.positions.is_empty() {
            return IdentifierKey::new(row.values().to_vec());
        }

        IdentifierKey::from_row(row, &self.positions)
    }
}

/// The identifier values of one row.
///
/// Equality and hashing follow [`Cell::same_value`], so keys can be grouped in hash maps with
/// null-aware semantics.
#[derive(Debug, Clone)]
pub struct IdentifierKey {
    values: Vec<Cell>,
}

impl IdentifierKey {
    /// Creates a key from its values.
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Creates a key by extracting values from a row at the given positions.
    ///
    /// Positions past the end of the row are read as [`Cell::Null`].
    pub fn from_row(row: &TableRow, positions: &[usize]) -> Self {
        let values = positions
            .iter()
            .map(|&index| row.get(index).cloned().unwrap_or(Cell::Null))
            .collect();

        Self { values }
    }

    /// Returns the key values.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Consumes the key and returns its values.
    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }
}

impl PartialEq for IdentifierKey {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.same_value(b))
    }
}

impl Eq for IdentifierKey {}

impl Hash for IdentifierKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.len().hash(state);
        for value in &self.values {
            value.hash_value(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_key(key: &IdentifierKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn row(values: Vec<Cell>) -> TableRow {
        TableRow::new(values)
    }

    #[test]
    fn key_from_row_picks_positions_in_order() {
        let row = row(vec![Cell::I64(42), Cell::from("name"), Cell::Bool(true)]);

        let key = IdentifierKey::from_row(&row, &[2, 0]);
        assert_eq!(key.values(), &[Cell::Bool(true), Cell::I64(42)]);
    }

    #[test]
    fn null_identifiers_match_each_other() {
        let identifier = IdentifierColumns::new(vec![0]);
        let a = row(vec![Cell::Null, Cell::from("a")]);
        let b = row(vec![Cell::Null, Cell::from("b")]);
        let c = row(vec![Cell::I64(0), Cell::from("a")]);

        assert!(identifier.same_logical_row(&a, &b));
        assert!(!identifier.same_logical_row(&a, &c));
        assert_eq!(identifier.key(&a), identifier.key(&b));
        assert_eq!(hash_key(&identifier.key(&a)), hash_key(&identifier.key(&b)));
    }

    #[test]
    fn composite_key_requires_every_position() {
        let identifier = IdentifierColumns::new(vec![0, 1]);
        let a = row(vec![Cell::I64(1), Cell::from("x"), Cell::from("a")]);
        let b = row(vec![Cell::I64(1), Cell::from("y"), Cell::from("a")]);

        assert!(!identifier.same_logical_row(&a, &b));
        assert_ne!(identifier.key(&a), identifier.key(&b));
    }

    #[test]
    fn whole_row_identity_compares_every_field() {
        let identifier = IdentifierColumns::whole_row();
        let a = row(vec![Cell::I64(1), Cell::from("a")]);
        let b = row(vec![Cell::I64(1), Cell::from("a")]);
        let c = row(vec![Cell::I64(1), Cell::from("b")]);

        assert!(identifier.same_logical_row(&a, &b));
        assert!(!identifier.same_logical_row(&a, &c));
        assert_eq!(identifier.key(&a), identifier.key(&b));
    }
}
