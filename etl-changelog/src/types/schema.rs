use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::IdentifierColumns;

/// Name of the operation tag column in a changelog view.
pub const CHANGE_TYPE_COLUMN_NAME: &str = "_change_type";
/// Name of the change ordinal column in a changelog view.
pub const CHANGE_ORDINAL_COLUMN_NAME: &str = "_change_ordinal";
/// Name of the column holding the snapshot that committed a change.
pub const COMMIT_SNAPSHOT_ID_COLUMN_NAME: &str = "_commit_snapshot_id";

/// Column layout of a changelog.
///
/// The schema lists the data columns in row order. The operation tag has a name but no position
/// in the row, since it travels as a typed [`crate::types::ChangeType`]. The change ordinal, when
/// present, is an ordinary data column whose position is remembered here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSchema {
    column_names: Vec<String>,
    change_type_column: String,
    change_ordinal_index: Option<usize>,
}

impl ChangelogSchema {
    /// Creates a schema with the default metadata column names.
    ///
    /// The change ordinal position is detected from [`CHANGE_ORDINAL_COLUMN_NAME`].
    pub fn new<S: Into<String>>(column_names: impl IntoIterator<Item = S>) -> Self {
        let column_names: Vec<String> = column_names.into_iter().map(Into::into).collect();
        let change_ordinal_index = column_names
            .iter()
            .position(|name| name == CHANGE_ORDINAL_COLUMN_NAME);

        Self {
            column_names,
            change_type_column: CHANGE_TYPE_COLUMN_NAME.to_string(),
            change_ordinal_index,
        }
    }

    /// Overrides the name of the operation tag column.
    pub fn with_change_type_column(mut self, name: impl Into<String>) -> Self {
        self.change_type_column = name.into();
        self
    }

    /// Overrides which data column holds the change ordinal.
    ///
    /// Fails with [`ErrorKind::MissingColumn`] when the column is not part of the schema.
    pub fn with_change_ordinal_column(mut self, name: &str) -> EtlResult<Self> {
        let Some(index) = self.column_index(name) else {
            bail!(
                ErrorKind::MissingColumn,
                "Change ordinal column does not exist in the table",
                format!("column `{name}`")
            );
        };

        self.change_ordinal_index = Some(index);
        Ok(self)
    }

    /// Returns the data column names in row order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns the number of data columns.
    pub fn len(&self) -> usize {
        self.column_names.len()
    }

    /// Returns `true` if the schema has no data columns.
    pub fn is_empty(&self) -> bool {
        self.column_names.is_empty()
    }

    /// Returns the name of the operation tag column.
    pub fn change_type_column(&self) -> &str {
        &self.change_type_column
    }

    /// Returns the position of a data column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|column| column == name)
    }

    /// Returns the position of the change ordinal column, if the schema has one.
    pub fn change_ordinal_index(&self) -> Option<usize> {
        self.change_ordinal_index
    }

    /// Returns the position of the change ordinal column, failing if the schema has none.
    pub fn require_change_ordinal_index(&self) -> EtlResult<usize> {
        match self.change_ordinal_index {
            Some(index) => Ok(index),
            None => bail!(
                ErrorKind::ConfigError,
                "Changelog schema has no change ordinal column",
                format!("expected a column named `{CHANGE_ORDINAL_COLUMN_NAME}`")
            ),
        }
    }

    /// Resolves identifier column names to row positions.
    ///
    /// Fails with [`ErrorKind::ConfigError`] naming the first column that does not exist. An
    /// empty list resolves to whole-row identity.
    pub fn identifier_columns<S: AsRef<str>>(&self, names: &[S]) -> EtlResult<IdentifierColumns> {
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let Some(index) = self.column_index(name) else {
                bail!(
                    ErrorKind::ConfigError,
                    "Identifier column does not exist in the table",
                    format!("column `{name}`")
                );
            };
            positions.push(index);
        }

        Ok(IdentifierColumns::new(positions))
    }
}
