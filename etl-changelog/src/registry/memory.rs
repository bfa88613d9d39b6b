use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::EtlResult;
use crate::registry::ViewRegistry;
use crate::types::{ChangeRecord, ChangelogSchema};

/// A registered changelog.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub schema: ChangelogSchema,
    pub records: Vec<ChangeRecord>,
}

#[derive(Debug)]
struct Inner {
    views: HashMap<String, View>,
}

/// In-memory view registry for testing and development purposes.
///
/// [`MemoryViewRegistry`] keeps the latest contents of every registered view. Clones share the
/// same views, so a clone handed to a procedure can be inspected afterwards.
#[derive(Debug, Clone)]
pub struct MemoryViewRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryViewRegistry {
    /// Creates a new registry without views.
    pub fn new() -> Self {
        let inner = Inner {
            views: HashMap::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns a copy of all registered views keyed by name.
    pub async fn views(&self) -> HashMap<String, View> {
        let inner = self.inner.lock().await;
        inner.views.clone()
    }

    /// Returns a copy of the view registered under `name`.
    pub async fn view(&self, name: &str) -> Option<View> {
        let inner = self.inner.lock().await;
        inner.views.get(name).cloned()
    }

    /// Removes all registered views.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.views.clear();
    }
}

impl Default for MemoryViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRegistry for MemoryViewRegistry {
    fn name() -> &'static str {
        "memory"
    }

    async fn register_view(
        &self,
        name: &str,
        schema: &ChangelogSchema,
        records: Vec<ChangeRecord>,
    ) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;

        info!(view = name, rows = records.len(), "registering view");

        for record in &records {
            debug!("  {} {:?}", record.change_type, record.values());
        }

        let view = View {
            schema: schema.clone(),
            records,
        };
        if inner.views.insert(name.to_string(), view).is_some() {
            info!(view = name, "replaced existing view");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    #[tokio::test]
    async fn registering_twice_replaces_the_view() {
        let registry = MemoryViewRegistry::new();
        let schema = ChangelogSchema::new(["id"]);

        registry
            .register_view("items_changes", &schema, vec![ChangeRecord::insert(vec![Cell::I64(1)])])
            .await
            .unwrap();
        registry
            .clone()
            .register_view("items_changes", &schema, vec![ChangeRecord::delete(vec![Cell::I64(2)])])
            .await
            .unwrap();

        let view = registry.view("items_changes").await.unwrap();
        assert_eq!(view.records, vec![ChangeRecord::delete(vec![Cell::I64(2)])]);
        assert_eq!(registry.views().await.len(), 1);

        registry.clear().await;
        assert!(registry.view("items_changes").await.is_none());
    }
}
