//! In-memory spec store

use super::{SpecStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use flowcat_spec::{FlowId, FlowSpec};

/// Process-local store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemorySpecStore {
    specs: DashMap<FlowId, FlowSpec>,
}

impl InMemorySpecStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored specs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[async_trait]
impl SpecStore for InMemorySpecStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &FlowId) -> Result<Option<FlowSpec>, StoreError> {
        Ok(self.specs.get(id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, spec: &FlowSpec) -> Result<(), StoreError> {
        self.specs.insert(spec.id.clone(), spec.clone());
        Ok(())
    }

    async fn delete(&self, id: &FlowId) -> Result<bool, StoreError> {
        Ok(self.specs.remove(id).is_some())
    }

    async fn exists(&self, id: &FlowId) -> Result<bool, StoreError> {
        Ok(self.specs.contains_key(id))
    }

    async fn get_all(&self) -> Result<Vec<FlowSpec>, StoreError> {
        Ok(self.specs.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemorySpecStore::new();
        let spec = FlowSpec::new(FlowId::new("g", "n"), "FS:///t.template");

        store.put(&spec).await.unwrap();
        assert!(store.exists(&spec.id).await.unwrap());
        assert_eq!(store.get(&spec.id).await.unwrap(), Some(spec.clone()));
        assert_eq!(store.get_all().await.unwrap().len(), 1);

        assert!(store.delete(&spec.id).await.unwrap());
        assert!(!store.delete(&spec.id).await.unwrap());
        assert!(store.is_empty());
    }
}
