//! Flow catalog
//!
//! [`FlowCatalog`] owns the spec store and runs every mutation through the same
//! sequence: validate, authorize, prepare the candidate, ask the listeners,
//! commit. A failure at any step leaves the store untouched.

use crate::config::{CatalogConfig, ConfigError};
use crate::error::{CatalogError, CatalogResult, ValidationError};
use crate::execution::ExecutionIdGenerator;
use crate::lifecycle::{Lifecycle, ServiceState};
use crate::listener::{ListenerRegistry, SpecCatalogListener};
use crate::locks::KeyedLocks;
use crate::store::SpecStore;
use crate::validation::SpecValidator;
use flowcat_auth::{AuthorizationEngine, AuthorizationRequest, RequestContext};
use flowcat_patch::{PatchDocument, PatchMerger};
use flowcat_spec::{
    ExecutionId, FlowId, FlowSpec, ScheduleSpec, ServiceRequester, REQUESTER_LIST_KEY,
    UNSCHEDULE_KEY,
};
use std::fmt;
use std::sync::Arc;

/// Result of a committed mutation or a triggered run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowCommit {
    /// Spec as stored (or as handed to listeners for a run)
    pub spec: FlowSpec,
    /// Run started synchronously, or [`ExecutionId::NOT_RUN`]
    pub execution_id: ExecutionId,
}

/// Catalog of flow specs
///
/// # Characteristics
/// - Per-flow serialization, no global lock
/// - Listeners see every candidate before commit
/// - Reads are not access-controlled
pub struct FlowCatalog {
    store: Arc<dyn SpecStore>,
    listeners: ListenerRegistry,
    auth: AuthorizationEngine,
    merger: PatchMerger,
    validator: SpecValidator,
    locks: KeyedLocks<FlowId>,
    executions: ExecutionIdGenerator,
    lifecycle: Lifecycle,
}

impl fmt::Debug for FlowCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowCatalog")
            .field("store", &self.store.name())
            .field("listeners", &self.listeners)
            .field("state", &self.lifecycle.state())
            .finish_non_exhaustive()
    }
}

impl FlowCatalog {
    /// Create catalog with default validation bounds
    #[must_use]
    pub fn new(store: Arc<dyn SpecStore>, auth: AuthorizationEngine) -> Self {
        Self {
            store,
            listeners: ListenerRegistry::new(),
            auth,
            merger: PatchMerger::new(),
            validator: SpecValidator::default(),
            locks: KeyedLocks::new(),
            executions: ExecutionIdGenerator::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Build store and identity providers from configuration
    ///
    /// # Errors
    /// Returns error if the group file cannot be loaded
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        let auth = AuthorizationEngine::new(
            config.group_service()?,
            Arc::new(config.requester_service()),
        );
        Ok(Self::new(config.open_store(), auth).with_validator(SpecValidator::from_config(config)))
    }

    /// With validator
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, validator: SpecValidator) -> Self {
        self.validator = validator;
        self
    }

    /// With listener
    #[must_use]
    pub fn with_listener(self, listener: Arc<dyn SpecCatalogListener>) -> Self {
        self.listeners.add(listener);
        self
    }

    /// Compilation listeners
    #[inline]
    #[must_use]
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SpecStore> {
        &self.store
    }

    /// Current service state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.lifecycle.state()
    }

    // ---- lifecycle ----

    /// Prepare the store, refresh group membership and begin accepting operations
    ///
    /// A group file that cannot be re-read leaves the membership loaded at
    /// construction in place.
    ///
    /// # Errors
    /// Returns error if not in [`ServiceState::New`] or the store fails to initialize
    pub async fn start(&self) -> CatalogResult<()> {
        self.lifecycle
            .transition(ServiceState::New, ServiceState::Starting)?;
        if let Err(e) = self.store.init().await {
            tracing::error!(store = self.store.name(), "Catalog failed to start: {e}");
            self.lifecycle
                .transition(ServiceState::Starting, ServiceState::Failed)?;
            return Err(e.into());
        }
        if let Err(e) = self.auth.group_service().reload() {
            tracing::warn!("Keeping previous group membership: {e}");
        }
        self.lifecycle
            .transition(ServiceState::Starting, ServiceState::Running)?;
        tracing::info!(store = self.store.name(), "Flow catalog running");
        Ok(())
    }

    /// Wait until running
    ///
    /// # Errors
    /// Returns [`CatalogError::NotRunning`] if the catalog ends up failed or stopped instead
    pub async fn await_running(&self) -> CatalogResult<()> {
        let state = self
            .lifecycle
            .wait_for(|s| *s == ServiceState::Running || s.is_terminal())
            .await;
        if state == ServiceState::Running {
            Ok(())
        } else {
            Err(CatalogError::NotRunning(state))
        }
    }

    /// Stop accepting operations and drain those in flight
    ///
    /// # Errors
    /// Returns error if the catalog is not running
    pub async fn stop(&self) -> CatalogResult<()> {
        self.lifecycle
            .transition(ServiceState::Running, ServiceState::Stopping)?;
        self.lifecycle.drain().await;
        self.lifecycle
            .transition(ServiceState::Stopping, ServiceState::Terminated)?;
        tracing::info!("Flow catalog stopped");
        Ok(())
    }

    /// Wait until stopped or failed
    pub async fn await_terminated(&self) -> ServiceState {
        self.lifecycle.wait_for(|s| s.is_terminal()).await
    }

    // ---- mutations ----

    /// Register a new flow
    ///
    /// Caller identities replace any requester list in `spec`. A spec without a
    /// schedule runs once immediately and gets an execution id.
    ///
    /// # Errors
    /// - [`CatalogError::Validation`] for bad ids, templates or cron
    /// - [`CatalogError::Unauthorized`] if the caller may not create it
    /// - [`CatalogError::AlreadyExists`] if the id is taken
    /// - [`CatalogError::CompilationRejected`] if a listener refuses it
    pub async fn create(&self, spec: FlowSpec, ctx: &RequestContext) -> CatalogResult<FlowCommit> {
        let _admission = self.lifecycle.admit().await?;
        self.validator.validate_spec(&spec)?;

        let caller = self.requesters(ctx);
        self.authorize(
            &AuthorizationRequest::create(spec.owning_group.as_deref()),
            &caller,
            &spec.id,
        )?;

        let mut candidate = spec;
        candidate
            .set_requesters(&caller)
            .map_err(|e| CatalogError::Internal(e.to_string()))?;
        candidate.properties.remove(UNSCHEDULE_KEY);

        let _guard = self.locks.lock(&candidate.id).await;
        if self.store.exists(&candidate.id).await? {
            tracing::warn!(flow = %candidate.id, "Create rejected: flow already exists");
            return Err(CatalogError::AlreadyExists(candidate.id));
        }

        self.compile(&candidate).await?;
        self.store.put(&candidate).await?;

        let execution_id = self.execution_for(&candidate);
        tracing::info!(flow = %candidate.id, execution = %execution_id, "Created flow");
        Ok(FlowCommit {
            spec: candidate,
            execution_id,
        })
    }

    /// Replace an existing flow
    ///
    /// A missing requester list is carried forward from the stored spec.
    ///
    /// # Errors
    /// As [`FlowCatalog::create`], plus [`CatalogError::NotFound`]
    pub async fn update(&self, spec: FlowSpec, ctx: &RequestContext) -> CatalogResult<FlowCommit> {
        let _admission = self.lifecycle.admit().await?;
        self.validator.validate_spec(&spec)?;

        let _guard = self.locks.lock(&spec.id).await;
        let existing = self.load(&spec.id).await?;
        let caller = self.requesters(ctx);

        let candidate = self.prepare_update(&existing, spec, &caller)?;
        self.commit_update(candidate, "Updated flow").await
    }

    /// Apply a patch document to an existing flow
    ///
    /// # Errors
    /// As [`FlowCatalog::update`], plus [`CatalogError::Conflict`] when the
    /// document's base fingerprint is stale
    pub async fn partial_update(
        &self,
        id: &FlowId,
        patch: &PatchDocument,
        ctx: &RequestContext,
    ) -> CatalogResult<FlowCommit> {
        let _admission = self.lifecycle.admit().await?;
        self.validator.validate_id(id)?;

        let _guard = self.locks.lock(id).await;
        let existing = self.load(id).await?;
        let caller = self.requesters(ctx);
        // Authorized against the stored spec before any merge or validation
        self.authorize(&AuthorizationRequest::update(&existing), &caller, id)?;

        let merged = self.merger.merge(&existing, patch)?;
        self.validator.validate_spec(&merged)?;

        let candidate = self.prepare_update(&existing, merged, &caller)?;
        self.commit_update(candidate, "Patched flow").await
    }

    /// Remove a flow
    ///
    /// Listeners are not consulted.
    ///
    /// # Errors
    /// - [`CatalogError::NotFound`] if absent
    /// - [`CatalogError::Unauthorized`] if the caller may not delete it
    pub async fn delete(&self, id: &FlowId, ctx: &RequestContext) -> CatalogResult<FlowSpec> {
        let _admission = self.lifecycle.admit().await?;

        let _guard = self.locks.lock(id).await;
        let existing = self.load(id).await?;
        let caller = self.requesters(ctx);
        self.authorize(&AuthorizationRequest::delete(&existing), &caller, id)?;

        if !self.store.delete(id).await? {
            return Err(CatalogError::NotFound(id.clone()));
        }
        tracing::info!(flow = %id, "Deleted flow");
        Ok(existing)
    }

    /// Trigger a run of a stored flow now
    ///
    /// Listeners see the stored spec with `runImmediately` set; the store is
    /// not modified.
    ///
    /// # Errors
    /// - [`CatalogError::NotFound`] if absent
    /// - [`CatalogError::Unauthorized`] if the caller may not update it
    /// - [`CatalogError::CompilationRejected`] if a listener refuses the run
    pub async fn run_immediately(&self, id: &FlowId, ctx: &RequestContext) -> CatalogResult<FlowCommit> {
        let _admission = self.lifecycle.admit().await?;

        let _guard = self.locks.lock(id).await;
        let existing = self.load(id).await?;
        let caller = self.requesters(ctx);
        self.authorize(&AuthorizationRequest::update(&existing), &caller, id)?;

        let mut candidate = existing;
        candidate
            .schedule
            .get_or_insert_with(ScheduleSpec::default)
            .run_immediately = true;
        self.compile(&candidate).await?;

        let execution_id = self.executions.next_id();
        tracing::info!(flow = %id, execution = %execution_id, "Triggered flow run");
        Ok(FlowCommit {
            spec: candidate,
            execution_id,
        })
    }

    // ---- reads ----

    /// Load one flow
    ///
    /// # Errors
    /// Returns [`CatalogError::NotFound`] if absent
    pub async fn get(&self, id: &FlowId) -> CatalogResult<FlowSpec> {
        let _admission = self.lifecycle.admit().await?;
        self.load(id).await
    }

    /// Every stored flow, sorted by id
    ///
    /// # Errors
    /// Returns error if the store fails
    pub async fn list(&self) -> CatalogResult<Vec<FlowSpec>> {
        let _admission = self.lifecycle.admit().await?;
        let mut specs = self.store.get_all().await?;
        specs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(specs)
    }

    // ---- internals ----

    async fn load(&self, id: &FlowId) -> CatalogResult<FlowSpec> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    fn requesters(&self, ctx: &RequestContext) -> Vec<ServiceRequester> {
        self.auth.requester_service().find_requesters(ctx)
    }

    fn authorize(
        &self,
        request: &AuthorizationRequest<'_>,
        caller: &[ServiceRequester],
        id: &FlowId,
    ) -> CatalogResult<()> {
        self.auth
            .authorize(request, caller)
            .into_result()
            .map_err(|reason| {
                tracing::warn!(flow = %id, action = %request.action, "Authorization denied: {reason}");
                CatalogError::Unauthorized(reason)
            })
    }

    /// Authorize an update of `existing` to `candidate` and normalize the candidate
    fn prepare_update(
        &self,
        existing: &FlowSpec,
        mut candidate: FlowSpec,
        caller: &[ServiceRequester],
    ) -> CatalogResult<FlowSpec> {
        let new_requesters = candidate
            .requesters()
            .map_err(|e| ValidationError::MalformedRequesterList(e.to_string()))?;

        let request = AuthorizationRequest::update(existing)
            .with_owning_group(candidate.owning_group.as_deref())
            .with_requesters(new_requesters.as_deref());
        self.authorize(&request, caller, &existing.id)?;

        if new_requesters.is_none() {
            if let Some(stored) = existing.properties.get(REQUESTER_LIST_KEY) {
                candidate.properties.insert(REQUESTER_LIST_KEY, stored);
            }
        }
        apply_unschedule(&mut candidate);
        Ok(candidate)
    }

    async fn commit_update(&self, candidate: FlowSpec, what: &str) -> CatalogResult<FlowCommit> {
        self.compile(&candidate).await?;
        self.store.put(&candidate).await?;

        let execution_id = self.execution_for(&candidate);
        tracing::info!(flow = %candidate.id, execution = %execution_id, "{what}");
        Ok(FlowCommit {
            spec: candidate,
            execution_id,
        })
    }

    async fn compile(&self, candidate: &FlowSpec) -> CatalogResult<()> {
        self.listeners.notify(candidate).await.map(|_| ()).map_err(|rejection| {
            tracing::warn!(
                flow = %candidate.id,
                listener = %rejection.listener,
                "Compilation rejected: {}",
                rejection.message
            );
            CatalogError::CompilationRejected {
                flow: candidate.id.clone(),
                listener: rejection.listener,
                message: rejection.message,
            }
        })
    }

    fn execution_for(&self, spec: &FlowSpec) -> ExecutionId {
        if spec.is_scheduled() {
            ExecutionId::NOT_RUN
        } else {
            self.executions.next_id()
        }
    }
}

/// Turn the unschedule directive into the never-run schedule and strip it
fn apply_unschedule(spec: &mut FlowSpec) {
    if spec.properties.unschedule_requested() {
        spec.schedule = Some(ScheduleSpec::never_run());
    }
    spec.properties.remove(UNSCHEDULE_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcat_spec::NEVER_RUN_CRON;

    #[test]
    fn unschedule_directive_installs_never_run() {
        let mut spec = FlowSpec::new(FlowId::new("g", "n"), "FS:///t.template")
            .with_schedule(ScheduleSpec::cron("0 0 12 * * *").with_run_immediately(true))
            .with_property(UNSCHEDULE_KEY, "true");

        apply_unschedule(&mut spec);

        let schedule = spec.schedule.unwrap();
        assert_eq!(schedule.cron_expression(), Some(NEVER_RUN_CRON));
        assert!(!schedule.run_immediately);
        assert!(!spec.properties.contains_key(UNSCHEDULE_KEY));
    }

    #[test]
    fn false_directive_is_only_stripped() {
        let schedule = ScheduleSpec::cron("0 0 12 * * *");
        let mut spec = FlowSpec::new(FlowId::new("g", "n"), "FS:///t.template")
            .with_schedule(schedule.clone())
            .with_property(UNSCHEDULE_KEY, "false");

        apply_unschedule(&mut spec);

        assert_eq!(spec.schedule, Some(schedule));
        assert!(spec.properties.is_empty());
    }
}
