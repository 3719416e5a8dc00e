//! Catalog lifecycle
//!
//! [`Lifecycle`] tracks the service state and gates operations: work is only
//! admitted while running, and stopping waits for admitted work to drain.

use crate::error::CatalogError;
use parking_lot::Mutex;
use std::fmt;
use tokio::sync::{watch, RwLock, RwLockReadGuard};

/// Service state of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Constructed, not started
    New,
    /// Preparing the store
    Starting,
    /// Accepting operations
    Running,
    /// Draining in-flight operations
    Stopping,
    /// Stopped
    Terminated,
    /// Start failed
    Failed,
}

impl ServiceState {
    /// Check if no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::Failed)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "NEW",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Terminated => "TERMINATED",
            Self::Failed => "FAILED",
        })
    }
}

/// State machine plus drain gate
#[derive(Debug)]
pub struct Lifecycle {
    // Serializes transitions; the watch channel broadcasts them
    transition: Mutex<()>,
    state: watch::Sender<ServiceState>,
    gate: RwLock<()>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Admission ticket for one operation
///
/// `stop` cannot finish while any ticket is alive.
#[derive(Debug)]
pub struct Admission<'a> {
    _gate: RwLockReadGuard<'a, ()>,
}

impl Lifecycle {
    /// Create lifecycle in [`ServiceState::New`]
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ServiceState::New);
        Self {
            transition: Mutex::new(()),
            state,
            gate: RwLock::new(()),
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Move from `from` to `to`
    ///
    /// # Errors
    /// Returns [`CatalogError::InvalidTransition`] if the current state is not `from`
    pub fn transition(&self, from: ServiceState, to: ServiceState) -> Result<(), CatalogError> {
        let _serial = self.transition.lock();
        let current = self.state();
        if current != from {
            return Err(CatalogError::InvalidTransition { from: current, to });
        }
        self.state.send_replace(to);
        tracing::debug!("Catalog state {from} -> {to}");
        Ok(())
    }

    /// Admit one operation
    ///
    /// # Errors
    /// Returns [`CatalogError::NotRunning`] outside [`ServiceState::Running`]
    pub async fn admit(&self) -> Result<Admission<'_>, CatalogError> {
        let state = self.state();
        if state != ServiceState::Running {
            return Err(CatalogError::NotRunning(state));
        }
        let gate = self.gate.read().await;
        // stop may have begun while waiting for the gate
        let state = self.state();
        if state != ServiceState::Running {
            return Err(CatalogError::NotRunning(state));
        }
        Ok(Admission { _gate: gate })
    }

    /// Wait until every admitted operation has finished
    pub async fn drain(&self) {
        drop(self.gate.write().await);
    }

    /// Wait until the state satisfies `ready`
    pub async fn wait_for(&self, ready: impl FnMut(&ServiceState) -> bool) -> ServiceState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(ready).await {
            Ok(state) => *state,
            // Sender lives in self, so the channel cannot close while borrowed
            Err(_) => self.state(),
        };
        state
    }
}
