//! The generate-changes procedure.
//!
//! [`GenerateChanges`] reads the raw changelog of a table over a snapshot range, normalizes it
//! when identifier columns are given and registers the result as a view.

use etl_config::shared::NormalizationMode;
use tracing::info;

use crate::error::EtlResult;
use crate::normalize::{ChangelogNormalizer, ConfiguredNormalizer};
use crate::range::{ChangeRangeRequest, resolve_snapshot_range};
use crate::registry::ViewRegistry;
use crate::source::ChangeSource;

/// Suffix appended to the table name when no view name is requested.
const VIEW_NAME_SUFFIX: &str = "_changes";

/// Arguments of a [`GenerateChanges`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangesRequest {
    /// Table to read changes from, possibly qualified as `namespace.table`.
    pub table: String,
    pub range: ChangeRangeRequest,
    /// Name of the view to register, derived from the table name when absent.
    pub view_name: Option<String>,
    /// Columns identifying the same logical row.
    ///
    /// Without identifier columns the raw changelog is registered as is.
    pub identifier_columns: Vec<String>,
    pub mode: NormalizationMode,
}

impl ChangesRequest {
    /// Creates a request reading the whole history of `table` without normalization.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Sets the snapshot range to read.
    pub fn with_range(mut self, range: ChangeRangeRequest) -> Self {
        self.range = range;
        self
    }

    /// Sets the name of the view to register.
    pub fn with_view_name(mut self, view_name: impl Into<String>) -> Self {
        self.view_name = Some(view_name.into());
        self
    }

    /// Sets the identifier columns and the normalization mode.
    pub fn with_identifier_columns<S: Into<String>>(
        mut self,
        identifier_columns: impl IntoIterator<Item = S>,
        mode: NormalizationMode,
    ) -> Self {
        self.identifier_columns = identifier_columns.into_iter().map(Into::into).collect();
        self.mode = mode;
        self
    }

    /// Returns the view name to register, see [`default_view_name`].
    pub fn resolved_view_name(&self) -> String {
        self.view_name
            .clone()
            .unwrap_or_else(|| default_view_name(&self.table))
    }
}

/// Returns the default view name for `table`: its last dot-separated segment plus `_changes`.
pub fn default_view_name(table: &str) -> String {
    let short_name = table.rsplit('.').next().unwrap_or(table);

    format!("{short_name}{VIEW_NAME_SUFFIX}")
}

/// Splits a comma-separated list of identifier columns, ignoring blank entries.
pub fn parse_identifier_columns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads, normalizes and registers the changelog of a table.
#[derive(Debug, Clone)]
pub struct GenerateChanges<S, R> {
    source: S,
    registry: R,
}

impl<S, R> GenerateChanges<S, R>
where
    S: ChangeSource,
    R: ViewRegistry,
{
    /// Creates a new [`GenerateChanges`] procedure.
    pub fn new(source: S, registry: R) -> Self {
        Self { source, registry }
    }

    /// Runs the procedure and returns the name of the registered view.
    ///
    /// Identifier columns are resolved before anything is read, so a missing column fails the
    /// run without touching the source. An empty snapshot range registers an empty view.
    pub async fn run(&self, request: &ChangesRequest) -> EtlResult<String> {
        let table = request.table.as_str();
        let schema = self.source.schema(table).await?;

        let normalizer = if request.identifier_columns.is_empty() {
            None
        } else {
            Some(ConfiguredNormalizer::from_schema(
                request.mode,
                &schema,
                &request.identifier_columns,
            )?)
        };

        let history = self.source.history(table).await?;
        let range = resolve_snapshot_range(&history, &request.range)?;
        let records = self.source.read_changes(table, &range).await?;
        let input = records.len();

        let records = match &normalizer {
            Some(normalizer) => normalizer.normalize(records),
            None => records,
        };

        let view_name = request.resolved_view_name();
        info!(
            source = S::name(),
            registry = R::name(),
            table,
            view = %view_name,
            ?range,
            mode = ?normalizer.as_ref().map(ConfiguredNormalizer::mode),
            input,
            output = records.len(),
            "generated changes"
        );

        self.registry
            .register_view(&view_name, &schema, records)
            .await?;

        Ok(view_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_view_name_uses_last_segment() {
        assert_eq!(default_view_name("catalog.db.items"), "items_changes");
        assert_eq!(default_view_name("items"), "items_changes");
    }

    #[test]
    fn requested_view_name_wins() {
        let request = ChangesRequest::new("db.items").with_view_name("recent");

        assert_eq!(request.resolved_view_name(), "recent");
    }

    #[test]
    fn identifier_list_ignores_blanks() {
        assert_eq!(parse_identifier_columns("id, name"), vec!["id", "name"]);
        assert!(parse_identifier_columns("").is_empty());
        assert_eq!(parse_identifier_columns("id,,"), vec!["id"]);
    }
}
