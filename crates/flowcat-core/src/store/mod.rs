//! Spec persistence
//!
//! [`SpecStore`] is the catalog's only view of durable state. Two backends are
//! provided: [`InMemorySpecStore`] and [`FsSpecStore`].

mod fs;
mod memory;

pub use fs::FsSpecStore;
pub use memory::InMemorySpecStore;

use async_trait::async_trait;
use flowcat_spec::{FlowId, FlowSpec};
use std::path::PathBuf;

/// Key-value store of flow specs
///
/// Stores do no locking of their own beyond what keeps single calls
/// consistent; the catalog serializes writers per flow.
#[async_trait]
pub trait SpecStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Prepare the backend
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Load one spec
    async fn get(&self, id: &FlowId) -> Result<Option<FlowSpec>, StoreError>;

    /// Insert or replace a spec
    async fn put(&self, spec: &FlowSpec) -> Result<(), StoreError>;

    /// Remove a spec; `false` if it did not exist
    async fn delete(&self, id: &FlowId) -> Result<bool, StoreError>;

    /// Check whether a spec exists
    async fn exists(&self, id: &FlowId) -> Result<bool, StoreError> {
        Ok(self.get(id).await?.is_some())
    }

    /// Load every spec, in no particular order
    async fn get_all(&self) -> Result<Vec<FlowSpec>, StoreError>;
}

/// Spec store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Spec could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored content is inconsistent with its location
    #[error("corrupt entry at {path}: {reason}")]
    Corrupt {
        /// Offending file or key
        path: PathBuf,
        /// What is inconsistent
        reason: String,
    },

    /// Flow id cannot be mapped onto a storage key
    #[error("flow {0} has no valid storage location")]
    InvalidKey(FlowId),
}

impl StoreError {
    /// Create I/O error
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this is a transient I/O failure
    #[inline]
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
