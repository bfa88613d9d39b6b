use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::ValidationError;

/// Default name of the operation tag column.
pub const DEFAULT_CHANGE_TYPE_COLUMN: &str = "_change_type";

/// Default name of the change ordinal column.
pub const DEFAULT_CHANGE_ORDINAL_COLUMN: &str = "_change_ordinal";

/// Which normalizer turns a raw changelog into a normalized one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Partition by identifier and change ordinal, producing pre- and post-images.
    #[default]
    Batch,
    /// Compare adjacent rows of sorted input, producing before and after images.
    Streaming,
}

/// Configuration of a changelog normalization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub mode: NormalizationMode,
    /// Data columns of the changelog in row order, excluding the change type column.
    pub columns: Vec<String>,
    /// Columns identifying the same logical row. Empty means every row is its own identity.
    #[serde(default)]
    pub identifier_columns: Vec<String>,
    #[serde(default = "default_change_type_column")]
    pub change_type_column: String,
    #[serde(default = "default_change_ordinal_column")]
    pub change_ordinal_column: String,
    /// Whether streaming input already arrives sorted by identifier and change type.
    ///
    /// Sorted input is normalized without being buffered.
    #[serde(default)]
    pub presorted: bool,
}

impl NormalizerConfig {
    /// Creates a configuration with default metadata column names.
    pub fn new(mode: NormalizationMode, columns: Vec<String>, identifier_columns: Vec<String>) -> Self {
        Self {
            mode,
            columns,
            identifier_columns,
            change_type_column: default_change_type_column(),
            change_ordinal_column: default_change_ordinal_column(),
            presorted: false,
        }
    }

    /// Validates the column layout for the configured mode.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.columns.is_empty() {
            return Err(ValidationError::NoColumns);
        }

        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(ValidationError::DuplicateColumn(column.clone()));
            }
        }

        if seen.contains(self.change_type_column.as_str()) {
            return Err(ValidationError::ChangeTypeColumnInColumns(
                self.change_type_column.clone(),
            ));
        }

        if let Some(column) = self
            .identifier_columns
            .iter()
            .find(|column| !seen.contains(column.as_str()))
        {
            return Err(ValidationError::UnknownIdentifierColumn(column.clone()));
        }

        if self.mode == NormalizationMode::Batch
            && !seen.contains(self.change_ordinal_column.as_str())
        {
            return Err(ValidationError::MissingChangeOrdinalColumn(
                self.change_ordinal_column.clone(),
            ));
        }

        Ok(())
    }
}

impl Config for NormalizerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["columns", "identifier_columns"];
}

fn default_change_type_column() -> String {
    DEFAULT_CHANGE_TYPE_COLUMN.to_string()
}

fn default_change_ordinal_column() -> String {
    DEFAULT_CHANGE_ORDINAL_COLUMN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn valid_batch_config() {
        let config = NormalizerConfig::new(
            NormalizationMode::Batch,
            columns(&["id", "data", "_change_ordinal"]),
            columns(&["id"]),
        );

        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn batch_mode_requires_ordinal_column() {
        let config =
            NormalizerConfig::new(NormalizationMode::Batch, columns(&["id", "data"]), columns(&["id"]));

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingChangeOrdinalColumn("_change_ordinal".to_string()))
        );

        let config = NormalizerConfig {
            mode: NormalizationMode::Streaming,
            ..config
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn identifier_columns_must_exist() {
        let config = NormalizerConfig::new(
            NormalizationMode::Streaming,
            columns(&["id", "data"]),
            columns(&["id", "name"]),
        );

        assert_eq!(
            config.validate(),
            Err(ValidationError::UnknownIdentifierColumn("name".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_and_tag_columns() {
        let config = NormalizerConfig::new(
            NormalizationMode::Streaming,
            columns(&["id", "id"]),
            Vec::new(),
        );
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateColumn("id".to_string()))
        );

        let config = NormalizerConfig::new(
            NormalizationMode::Streaming,
            columns(&["id", "_change_type"]),
            Vec::new(),
        );
        assert_eq!(
            config.validate(),
            Err(ValidationError::ChangeTypeColumnInColumns("_change_type".to_string()))
        );
    }

    #[test]
    fn mode_deserializes_from_snake_case() {
        let mode: NormalizationMode = serde_json::from_str("\"streaming\"").unwrap();
        assert_eq!(mode, NormalizationMode::Streaming);
    }
}
