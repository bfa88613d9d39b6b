use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The changelog has no data columns.
    #[error("`columns` cannot be empty")]
    NoColumns,
    /// A data column is listed more than once.
    #[error("column `{0}` is listed more than once in `columns`")]
    DuplicateColumn(String),
    /// The operation tag column is listed as a data column.
    #[error("change type column `{0}` must not be listed in `columns`")]
    ChangeTypeColumnInColumns(String),
    /// An identifier column is not one of the data columns.
    #[error("identifier column `{0}` is not listed in `columns`")]
    UnknownIdentifierColumn(String),
    /// Batch normalization needs the change ordinal column.
    #[error("batch mode requires the change ordinal column `{0}` in `columns`")]
    MissingChangeOrdinalColumn(String),
}
