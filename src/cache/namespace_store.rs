use dashmap::DashMap;
use tracing::trace;

use crate::LookupError;
use crate::Namespace;
use crate::ProjectLookup;

/// Concurrent name → namespace map
#[derive(Debug, Default)]
pub struct NamespaceStore {
    namespaces: DashMap<String, Namespace>,
}

impl NamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous value
    pub fn upsert(
        &self,
        namespace: Namespace,
    ) -> Option<Namespace> {
        trace!(namespace = %namespace.name, "namespace stored");
        self.namespaces.insert(namespace.name.clone(), namespace)
    }

    pub fn remove(
        &self,
        name: &str,
    ) -> Option<Namespace> {
        self.namespaces.remove(name).map(|(_, ns)| ns)
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

impl ProjectLookup for NamespaceStore {
    fn get_namespace(
        &self,
        name: &str,
    ) -> Result<Namespace, LookupError> {
        self.namespaces
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }
}
