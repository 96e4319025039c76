use std::collections::HashMap;
use std::sync::Arc;

use super::http::{HttpOperation, OperationSpec};
use super::{FnOperation, Operation};
use crate::error::{Error, Result};
use crate::fetch::FetchResult;
use crate::types::{OperationInfo, Params};

/// Name to operation mapping, built once at startup
#[derive(Default, Clone)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.operations.keys().collect();
        names.sort();
        f.debug_struct("OperationRegistry")
            .field("operations", &names)
            .finish()
    }
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry of HTTP-backed operations.
    ///
    /// Must be called inside a Tokio runtime; the runtime handle drives the
    /// HTTP client from worker threads.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for duplicate names, invalid URLs, or when no
    /// runtime is available.
    pub fn from_catalog(specs: &[OperationSpec]) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("catalog requires a Tokio runtime: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("datafetch-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let mut registry = Self::new();
        for spec in specs {
            if registry.contains(&spec.name) {
                return Err(Error::Config(format!(
                    "duplicate operation '{}' in catalog",
                    spec.name
                )));
            }
            let operation = HttpOperation::new(spec, client.clone(), handle.clone())?;
            registry.register(spec.name.clone(), operation);
        }

        tracing::debug!(operations = registry.len(), "Operation catalog loaded");
        Ok(registry)
    }

    /// Register `operation` under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, operation: impl Operation + 'static) {
        self.register_arc(name, Arc::new(operation));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, operation: Arc<dyn Operation>) {
        let name = name.into();
        if self.operations.insert(name.clone(), operation).is_some() {
            tracing::warn!(operation = %name, "Replaced registered operation");
        }
    }

    /// Register a closure with a description
    pub fn register_fn<F>(&mut self, name: impl Into<String>, description: impl Into<String>, f: F)
    where
        F: Fn(&Params) -> anyhow::Result<FetchResult> + Send + Sync + 'static,
    {
        self.register(name, FnOperation::new(description, f));
    }

    /// Look up `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownOperation` if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Operation>> {
        self.operations
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Catalog entries sorted by name
    #[must_use]
    pub fn list(&self) -> Vec<OperationInfo> {
        let mut infos: Vec<OperationInfo> = self
            .operations
            .iter()
            .map(|(name, op)| OperationInfo {
                name: name.clone(),
                description: op.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::ResponseFormat;

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        registry.register_fn("stock_zh_a_spot", "Spot quotes", |_| {
            Ok(FetchResult::Scalar(json!("spot")))
        });
        registry.register_fn("index_zh_a_hist", "Index history", |_| Ok(FetchResult::Empty));
        registry
    }

    #[test]
    fn test_resolve_known() {
        let op = registry().resolve("stock_zh_a_spot").unwrap();
        assert_eq!(
            op.invoke(&Params::new()).unwrap(),
            FetchResult::Scalar(json!("spot"))
        );
    }

    #[test]
    fn test_resolve_unknown() {
        let err = registry().resolve("no_such_op").err().unwrap();
        assert!(err.is_unknown_operation());
        assert!(err.to_string().contains("no_such_op"));
    }

    #[test]
    fn test_list_sorted_with_descriptions() {
        let list = registry().list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "index_zh_a_hist");
        assert_eq!(list[1].name, "stock_zh_a_spot");
        assert_eq!(list[1].description, "Spot quotes");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = registry();
        registry.register_fn("stock_zh_a_spot", "v2", |_| Ok(FetchResult::Empty));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list()[1].description, "v2");
    }

    #[test]
    fn test_empty_registry() {
        let registry = OperationRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
        assert!(format!("{registry:?}").contains("OperationRegistry"));
    }

    #[tokio::test]
    async fn test_from_catalog() {
        let specs = vec![
            OperationSpec::new("quotes", "http://127.0.0.1:9/quotes"),
            OperationSpec {
                format: ResponseFormat::Csv,
                description: "CSV bars".to_string(),
                ..OperationSpec::new("bars", "http://127.0.0.1:9/bars.csv")
            },
        ];
        let registry = OperationRegistry::from_catalog(&specs).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("bars"));
        assert_eq!(registry.list()[0].description, "CSV bars");
    }

    #[tokio::test]
    async fn test_from_catalog_rejects_duplicates() {
        let specs = vec![
            OperationSpec::new("quotes", "http://127.0.0.1:9/a"),
            OperationSpec::new("quotes", "http://127.0.0.1:9/b"),
        ];
        let err = OperationRegistry::from_catalog(&specs).unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_from_catalog_rejects_bad_url() {
        let specs = vec![OperationSpec::new("quotes", "not a url")];
        assert!(OperationRegistry::from_catalog(&specs).unwrap_err().is_config());
    }

    #[test]
    fn test_from_catalog_requires_runtime() {
        assert!(OperationRegistry::from_catalog(&[]).unwrap_err().is_config());
    }
}
