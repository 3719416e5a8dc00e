//! Testing utilities for the flowcat workspace
//!
//! Shared fixtures, a recording compilation listener and a switchable
//! requester identity.

#![allow(missing_docs)]

use async_trait::async_trait;
use flowcat_auth::{
    AuthorizationEngine, GroupOwnershipService, LocalGroupOwnershipService, RequestContext,
    RequesterService,
};
use flowcat_core::{AddSpecResponse, FlowCatalog, InMemorySpecStore, SpecCatalogListener, SpecStore};
use flowcat_spec::{FlowId, FlowSpec, ScheduleSpec, ServiceRequester};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TEST_TEMPLATE_URI: &str = "FS:///templates/test.template";
pub const TEST_SCHEDULE: &str = "0 0 12 * * *";
pub const TEST_GROUP_NAME: &str = "testGroup";

pub fn test_requester() -> ServiceRequester {
    ServiceRequester::user("testName", "testFrom")
}

pub fn test_requester2() -> ServiceRequester {
    ServiceRequester::user("testName2", "testFrom")
}

pub fn test_requester3() -> ServiceRequester {
    ServiceRequester::user("testName3", "testFrom")
}

/// Unscheduled spec with the test template
pub fn flow_spec(group: &str, name: &str) -> FlowSpec {
    FlowSpec::new(FlowId::new(group, name), TEST_TEMPLATE_URI)
}

/// Spec on the test cron schedule with three properties
pub fn scheduled_flow_spec(group: &str, name: &str) -> FlowSpec {
    flow_spec(group, name)
        .with_schedule(ScheduleSpec::cron(TEST_SCHEDULE).with_run_immediately(false))
        .with_property("param1", "value1")
        .with_property("param2", "value2")
        .with_property("param3", "value3")
}

/// Group file contents: `testGroup` holds `testName` and `testName2`
pub fn test_groups() -> LocalGroupOwnershipService {
    LocalGroupOwnershipService::from_members([(TEST_GROUP_NAME, vec!["testName", "testName2"])])
}

/// Listener that records every candidate and rejects chosen flow paths
#[derive(Debug, Default)]
pub struct RecordingListener {
    rejected_paths: RwLock<HashSet<String>>,
    invocations: AtomicUsize,
    seen: Mutex<Vec<FlowSpec>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject candidates whose [`FlowId::path`] is `path`
    pub fn reject_path(&self, path: impl Into<String>) {
        self.rejected_paths.write().insert(path.into());
    }

    pub fn accept_path(&self, path: &str) {
        self.rejected_paths.write().remove(path);
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<FlowSpec> {
        self.seen.lock().clone()
    }

    pub fn last_seen(&self) -> Option<FlowSpec> {
        self.seen.lock().last().cloned()
    }
}

#[async_trait]
impl SpecCatalogListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    async fn on_add_spec(&self, candidate: &FlowSpec) -> AddSpecResponse {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(candidate.clone());

        let path = candidate.id.path();
        if self.rejected_paths.read().contains(&path) {
            AddSpecResponse::rejected(format!("Could not compile flow {path}"))
        } else {
            AddSpecResponse::Accepted {
                compiled: Some(path),
            }
        }
    }
}

/// Requester service returning whatever identity the test sets
///
/// The request context is ignored.
#[derive(Debug)]
pub struct SwitchableRequesterService {
    current: RwLock<Vec<ServiceRequester>>,
    admins: RwLock<HashSet<String>>,
}

impl SwitchableRequesterService {
    pub fn new(initial: ServiceRequester) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(vec![initial]),
            admins: RwLock::new(HashSet::new()),
        })
    }

    pub fn set(&self, requester: ServiceRequester) {
        *self.current.write() = vec![requester];
    }

    /// Make subsequent calls unauthenticated
    pub fn clear(&self) {
        self.current.write().clear();
    }

    pub fn add_admin(&self, name: impl Into<String>) {
        self.admins.write().insert(name.into());
    }
}

impl RequesterService for SwitchableRequesterService {
    fn find_requesters(&self, _ctx: &RequestContext) -> Vec<ServiceRequester> {
        self.current.read().clone()
    }

    fn is_requester_whitelisted(&self, current: &[ServiceRequester]) -> bool {
        let admins = self.admins.read();
        current.iter().any(|r| admins.contains(&r.name))
    }
}

/// Catalog under test plus handles to its collaborators
pub struct CatalogHarness {
    pub catalog: Arc<FlowCatalog>,
    pub store: Arc<InMemorySpecStore>,
    pub listener: Arc<RecordingListener>,
    pub requesters: Arc<SwitchableRequesterService>,
}

impl CatalogHarness {
    /// Running catalog with the test groups, acting as [`test_requester`]
    pub async fn start() -> Self {
        Self::start_with_groups(Arc::new(test_groups())).await
    }

    pub async fn start_with_groups(groups: Arc<dyn GroupOwnershipService>) -> Self {
        let store = Arc::new(InMemorySpecStore::new());
        let listener = RecordingListener::new();
        let requesters = SwitchableRequesterService::new(test_requester());

        let engine = AuthorizationEngine::new(groups, requesters.clone());
        let catalog = FlowCatalog::new(store.clone() as Arc<dyn SpecStore>, engine)
            .with_listener(listener.clone());
        catalog.start().await.unwrap();

        Self {
            catalog: Arc::new(catalog),
            store,
            listener,
            requesters,
        }
    }

    pub fn ctx(&self) -> RequestContext {
        RequestContext::anonymous()
    }

    pub fn act_as(&self, requester: ServiceRequester) {
        self.requesters.set(requester);
    }

    /// Stored spec, bypassing the catalog
    pub async fn stored(&self, id: &FlowId) -> Option<FlowSpec> {
        self.store.get(id).await.unwrap()
    }
}
