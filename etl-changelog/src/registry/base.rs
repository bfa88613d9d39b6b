use std::future::Future;

use crate::error::EtlResult;
use crate::types::{ChangeRecord, ChangelogSchema};

/// Trait for systems that can publish a normalized changelog under a name.
///
/// Registering a name that already exists replaces the previous contents.
pub trait ViewRegistry {
    /// Returns the name of the registry.
    fn name() -> &'static str;

    /// Registers `records` under the view `name`.
    fn register_view(
        &self,
        name: &str,
        schema: &ChangelogSchema,
        records: Vec<ChangeRecord>,
    ) -> impl Future<Output = EtlResult<()>> + Send;
}
