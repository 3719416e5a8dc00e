//! Compilation listeners
//!
//! Listeners vet every candidate spec before it is committed. Any rejection
//! vetoes the mutation.

use async_trait::async_trait;
use flowcat_spec::FlowSpec;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Listener verdict on a candidate spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddSpecResponse {
    /// Candidate compiled; `compiled` is an opaque artifact description
    Accepted {
        /// Artifact description, if any
        compiled: Option<String>,
    },
    /// Candidate refused
    Rejected {
        /// Reason shown to the caller
        message: String,
    },
}

impl AddSpecResponse {
    /// Accepted without artifact
    #[inline]
    #[must_use]
    pub fn accepted() -> Self {
        Self::Accepted { compiled: None }
    }

    /// Rejected with message
    #[inline]
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Check if accepted
    #[inline]
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Validator notified of every add and update
#[async_trait]
pub trait SpecCatalogListener: Send + Sync {
    /// Unique listener name
    fn name(&self) -> &str;

    /// Vet a candidate spec
    async fn on_add_spec(&self, candidate: &FlowSpec) -> AddSpecResponse;
}

/// First rejection returned by [`ListenerRegistry::notify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Listener that refused
    pub listener: String,
    /// Listener's reason
    pub message: String,
}

/// Registered listeners, notified in registration order
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn SpecCatalogListener>>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.names())
            .finish()
    }
}

impl ListenerRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, replacing one with the same name
    pub fn add(&self, listener: Arc<dyn SpecCatalogListener>) -> Option<Arc<dyn SpecCatalogListener>> {
        let mut listeners = self.listeners.write();
        let name = listener.name().to_string();
        tracing::debug!("Registering listener {name}");
        match listeners.iter_mut().find(|l| l.name() == name) {
            Some(slot) => Some(std::mem::replace(slot, listener)),
            None => {
                listeners.push(listener);
                None
            }
        }
    }

    /// Unregister by name
    pub fn remove(&self, name: &str) -> Option<Arc<dyn SpecCatalogListener>> {
        let mut listeners = self.listeners.write();
        let index = listeners.iter().position(|l| l.name() == name)?;
        Some(listeners.remove(index))
    }

    /// Names in notification order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.listeners
            .read()
            .iter()
            .map(|l| l.name().to_string())
            .collect()
    }

    /// Number of listeners
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Ask every listener about `candidate`, stopping at the first rejection
    ///
    /// # Returns
    /// Number of listeners that accepted
    ///
    /// # Errors
    /// Returns the first [`Rejection`]
    pub async fn notify(&self, candidate: &FlowSpec) -> Result<usize, Rejection> {
        // Snapshot so no lock is held across listener awaits
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();

        for listener in &listeners {
            match listener.on_add_spec(candidate).await {
                AddSpecResponse::Accepted { compiled } => {
                    tracing::debug!(
                        flow = %candidate.id,
                        listener = listener.name(),
                        compiled = compiled.as_deref().unwrap_or(""),
                        "Listener accepted candidate"
                    );
                }
                AddSpecResponse::Rejected { message } => {
                    tracing::debug!(
                        flow = %candidate.id,
                        listener = listener.name(),
                        "Listener rejected candidate: {message}"
                    );
                    return Err(Rejection {
                        listener: listener.name().to_string(),
                        message,
                    });
                }
            }
        }
        Ok(listeners.len())
    }
}
