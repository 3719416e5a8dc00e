//! Create, update, read and delete through the catalog.

use flowcat_core::{CatalogError, ErrorClass, COMPILATION_FAILED};
use flowcat_spec::{
    FlowId, ScheduleSpec, ServiceRequester, NEVER_RUN_CRON, REQUESTER_LIST_KEY, UNSCHEDULE_KEY,
};
use flowcat_test_utils::{flow_spec, scheduled_flow_spec, test_requester, CatalogHarness};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn create_and_get() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "testFlow1");

    let commit = h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();
    assert_eq!(commit.execution_id.get(), -1);

    let stored = h.catalog.get(&spec.id).await.unwrap();
    assert_eq!(stored.schedule, spec.schedule);
    assert_eq!(stored.properties.get("param1"), Some("value1"));
    assert_eq!(stored.requesters().unwrap(), Some(vec![test_requester()]));
    assert_eq!(h.listener.invocations(), 1);
}

#[tokio::test]
async fn unscheduled_create_runs_immediately() {
    let h = CatalogHarness::start().await;

    let first = h
        .catalog
        .create(flow_spec("testGroup1", "run1"), &h.ctx())
        .await
        .unwrap();
    let second = h
        .catalog
        .create(flow_spec("testGroup1", "run2"), &h.ctx())
        .await
        .unwrap();

    assert!(first.execution_id.is_run());
    assert!(second.execution_id > first.execution_id);
}

#[tokio::test]
async fn duplicate_create_conflicts_without_notifying() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "testFlow2");
    h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();

    let err = h.catalog.create(spec, &h.ctx()).await.unwrap_err();
    assert!(matches!(err, CatalogError::AlreadyExists(_)));
    assert_eq!(err.http_status(), 409);
    assert_eq!(h.listener.invocations(), 1);
}

#[tokio::test]
async fn rejected_create_persists_nothing() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "testFlow3");
    h.listener.reject_path(spec.id.path());

    let err = h.catalog.create(spec.clone(), &h.ctx()).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);
    assert!(err.to_string().contains(COMPILATION_FAILED));
    assert!(h.stored(&spec.id).await.is_none());
}

#[tokio::test]
async fn rejected_update_leaves_stored_spec_identical() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "testFlow4");
    h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();
    let before = h.stored(&spec.id).await.unwrap().fingerprint().unwrap();

    h.listener.reject_path(spec.id.path());
    let changed = spec.clone().with_property("param1", "changed");
    let err = h.catalog.update(changed, &h.ctx()).await.unwrap_err();

    assert_eq!(err.http_status(), 400);
    let after = h.stored(&spec.id).await.unwrap().fingerprint().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn caller_supplied_requester_list_is_replaced_on_create() {
    let h = CatalogHarness::start().await;
    let mut spec = flow_spec("testGroup1", "forged");
    spec.set_requesters(&[ServiceRequester::user("someoneElse", "x")])
        .unwrap();

    let commit = h.catalog.create(spec, &h.ctx()).await.unwrap();
    assert_eq!(commit.spec.requesters().unwrap(), Some(vec![test_requester()]));
}

#[tokio::test]
async fn invalid_requests_are_unprocessable_and_never_compiled() {
    let h = CatalogHarness::start().await;
    let long = "a".repeat(129);

    let cases = [
        flow_spec(&long, "name"),
        flow_spec("group", &long),
        flow_spec("group", "badUri").tap_uri("FILE://bad/uri"),
        scheduled_flow_spec("group", "badCron").with_schedule(ScheduleSpec::cron("bad schedule")),
    ];
    for spec in cases {
        let err = h.catalog.create(spec, &h.ctx()).await.unwrap_err();
        assert_eq!(err.http_status(), 422, "{err}");
    }

    let err = h
        .catalog
        .create(flow_spec(&long, "name"), &h.ctx())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("is out of range"));
    assert_eq!(h.listener.invocations(), 0);
}

trait TapUri {
    fn tap_uri(self, uri: &str) -> Self;
}

impl TapUri for flowcat_spec::FlowSpec {
    fn tap_uri(mut self, uri: &str) -> Self {
        self.template_uris = uri.to_string();
        self
    }
}

#[tokio::test]
async fn update_requires_existing_flow() {
    let h = CatalogHarness::start().await;
    let err = h
        .catalog
        .update(scheduled_flow_spec("testGroup1", "missing"), &h.ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert_eq!(h.listener.invocations(), 0);
}

#[tokio::test]
async fn update_carries_requester_list_forward() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "carry");
    h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();

    let update = spec.with_property("param4", "value4");
    assert!(!update.properties.contains_key(REQUESTER_LIST_KEY));
    let commit = h.catalog.update(update, &h.ctx()).await.unwrap();

    assert_eq!(commit.spec.requesters().unwrap(), Some(vec![test_requester()]));
    assert_eq!(commit.execution_id.get(), -1);
}

#[tokio::test]
async fn unschedule_directive_installs_never_run_schedule() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "unschedule");
    h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();

    let update = spec
        .clone()
        .with_schedule(ScheduleSpec::cron("0 0 12 * * *").with_run_immediately(true))
        .with_property(UNSCHEDULE_KEY, "true");
    h.catalog.update(update, &h.ctx()).await.unwrap();

    let stored = h.catalog.get(&spec.id).await.unwrap();
    let schedule = stored.schedule.unwrap();
    assert_eq!(schedule.cron_expression(), Some(NEVER_RUN_CRON));
    assert!(!schedule.run_immediately);
    assert!(!stored.properties.contains_key(UNSCHEDULE_KEY));
}

#[tokio::test]
async fn unschedule_directive_is_stripped_on_create() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "stripped").with_property(UNSCHEDULE_KEY, "true");

    let commit = h.catalog.create(spec, &h.ctx()).await.unwrap();
    assert!(!commit.spec.properties.contains_key(UNSCHEDULE_KEY));
    assert_eq!(commit.spec.schedule.unwrap().cron_expression(), Some("0 0 12 * * *"));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "deleteMe");
    h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();

    h.catalog.delete(&spec.id, &h.ctx()).await.unwrap();
    assert!(matches!(
        h.catalog.get(&spec.id).await,
        Err(CatalogError::NotFound(_))
    ));
    assert!(matches!(
        h.catalog.delete(&spec.id, &h.ctx()).await,
        Err(CatalogError::NotFound(_))
    ));
    // delete never consults listeners
    assert_eq!(h.listener.invocations(), 1);
}

#[tokio::test]
async fn list_is_sorted_by_id() {
    let h = CatalogHarness::start().await;
    for (group, name) in [("b", "2"), ("a", "9"), ("b", "1")] {
        h.catalog
            .create(scheduled_flow_spec(group, name), &h.ctx())
            .await
            .unwrap();
    }

    let ids: Vec<FlowId> = h
        .catalog
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(
        ids,
        vec![FlowId::new("a", "9"), FlowId::new("b", "1"), FlowId::new("b", "2")]
    );
}

#[tokio::test]
async fn run_immediately_mints_id_without_touching_store() {
    let h = CatalogHarness::start().await;
    let spec = scheduled_flow_spec("testGroup1", "runNow");
    h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();
    let before = h.stored(&spec.id).await.unwrap();

    let commit = h.catalog.run_immediately(&spec.id, &h.ctx()).await.unwrap();

    assert!(commit.execution_id.is_run());
    assert!(h.listener.last_seen().unwrap().schedule.unwrap().run_immediately);
    assert_eq!(h.stored(&spec.id).await.unwrap(), before);
}

#[tokio::test]
async fn run_immediately_of_missing_flow_is_not_found() {
    let h = CatalogHarness::start().await;
    let err = h
        .catalog
        .run_immediately(&FlowId::new("g", "absent"), &h.ctx())
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn scheduled_create_with_run_immediately_returns_no_execution() {
    let h = CatalogHarness::start().await;
    let spec = flow_spec("testGroup1", "runNowScheduled")
        .with_schedule(ScheduleSpec::cron("0 0 12 * * *").with_run_immediately(true));

    let commit = h.catalog.create(spec.clone(), &h.ctx()).await.unwrap();

    assert_eq!(commit.execution_id.get(), -1);
    let stored = h.catalog.get(&spec.id).await.unwrap();
    assert!(stored.schedule.unwrap().run_immediately);
    assert!(h.listener.last_seen().unwrap().schedule.unwrap().run_immediately);
}
