use std::hash::{Hash, Hasher};

use crate::types::Cell;

/// Represents the data fields of a changelog row.
///
/// [`TableRow`] contains a vector of [`Cell`] values ordered to match the data columns of a
/// [`crate::types::ChangelogSchema`]. The operation tag is not part of the row; it is carried
/// next to it by [`crate::types::ChangeRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Column values in schema column order.
    values: Vec<Cell>,
}

impl TableRow {
    /// Creates a new table row with the given cell values.
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Returns the row values in schema column order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Returns mutable access to row values in schema column order.
    pub fn values_mut(&mut self) -> &mut Vec<Cell> {
        &mut self.values
    }

    /// Consumes the row and returns its values in schema column order.
    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }

    /// Returns the cell at `index`, or [`None`] if the row is shorter.
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.values.get(index)
    }

    /// Returns the number of cells in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` if both rows hold the same value in every field.
    ///
    /// Rows of different arity are never the same.
    pub fn same_values(&self, other: &TableRow) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.same_value(b))
    }

    /// Hashes every field consistently with [`TableRow::same_values`].
    pub fn hash_values<H: Hasher>(&self, state: &mut H) {
        self.values.len().hash(state);
        for value in &self.values {
            value.hash_value(state);
        }
    }
}

impl From<Vec<Cell>> for TableRow {
    fn from(values: Vec<Cell>) -> Self {
        TableRow::new(values)
    }
}
