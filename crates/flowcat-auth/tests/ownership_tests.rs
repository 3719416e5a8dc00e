//! Authorization against a file-backed group membership list.

use flowcat_auth::{
    AuthorizationEngine, AuthorizationRequest, ContextRequesterService, Decision, DenyReason,
    LocalGroupOwnershipService, RequestContext, RequesterService,
};
use flowcat_spec::{FlowId, FlowSpec, ServiceRequester};
use std::sync::Arc;

struct Fixture {
    _groups_file: tempfile::NamedTempFile,
    engine: AuthorizationEngine,
    requesters: Arc<ContextRequesterService>,
}

fn fixture() -> Fixture {
    let groups_file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(groups_file.path(), r#"{"testGroup":"testName,testName2"}"#).unwrap();

    let groups = LocalGroupOwnershipService::from_file(groups_file.path()).unwrap();
    let requesters = Arc::new(ContextRequesterService::new());
    Fixture {
        _groups_file: groups_file,
        engine: AuthorizationEngine::new(Arc::new(groups), requesters.clone()),
        requesters,
    }
}

fn caller(f: &Fixture, name: &str) -> Vec<ServiceRequester> {
    f.requesters
        .find_requesters(&RequestContext::user(name, "testFrom"))
}

fn group_owned_flow(f: &Fixture) -> FlowSpec {
    let mut spec = FlowSpec::new(FlowId::new("testGroup1", "testFlow1"), "FS:///templates/test.template")
        .with_owning_group("testGroup");
    spec.set_requesters(&caller(f, "testName")).unwrap();
    spec
}

#[test]
fn group_member_outside_requester_list_may_update() {
    let f = fixture();
    let existing = group_owned_flow(&f);

    let decision = f
        .engine
        .authorize(&AuthorizationRequest::update(&existing), &caller(&f, "testName2"));
    assert_eq!(decision, Decision::Allow);
}

#[test]
fn group_member_may_replace_requester_list_with_itself() {
    let f = fixture();
    let existing = group_owned_flow(&f);
    let new_list = caller(&f, "testName2");

    let request = AuthorizationRequest::update(&existing).with_requesters(Some(&new_list));
    assert!(f.engine.authorize(&request, &new_list).is_allowed());
}

#[test]
fn outsider_is_denied() {
    let f = fixture();
    let existing = group_owned_flow(&f);

    let decision = f
        .engine
        .authorize(&AuthorizationRequest::delete(&existing), &caller(&f, "testName3"));
    assert_eq!(decision, Decision::Deny(DenyReason::NotARequester));
}

#[test]
fn transfer_to_unknown_group_is_denied() {
    let f = fixture();
    let existing = group_owned_flow(&f);

    let request = AuthorizationRequest::update(&existing).with_owning_group(Some("dummyGroup"));
    let reason = f
        .engine
        .authorize(&request, &caller(&f, "testName"))
        .into_result()
        .unwrap_err();
    assert!(reason.to_string().contains("dummyGroup"));
}
