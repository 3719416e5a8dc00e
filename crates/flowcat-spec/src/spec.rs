//! Flow specifications
//!
//! Provides [`FlowSpec`], the persisted definition of a flow.

use crate::fingerprint::{FingerprintError, SpecFingerprint};
use crate::id::FlowId;
use crate::properties::{PropertyBag, REQUESTER_LIST_KEY};
use crate::requester::{
    deserialize_requesters, serialize_requesters, RequesterListError, ServiceRequester,
};
use crate::schedule::ScheduleSpec;
use serde::{Deserialize, Serialize};

/// Definition of a flow
///
/// Callers only ever hold snapshots; the catalog swaps whole values on commit.
///
/// # Invariants
/// - `id` never changes for the lifetime of the entry
/// - reserved properties are interpreted by the catalog, never by callers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSpec {
    /// Catalog key
    pub id: FlowId,

    /// Comma-separated template URIs
    pub template_uris: String,

    /// Schedule; absent means run once on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSpec>,

    /// Free-form properties
    #[serde(default)]
    pub properties: PropertyBag,

    /// Group whose members may also mutate the flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_group: Option<String>,
}

impl FlowSpec {
    /// Create new spec with no schedule, properties or owner
    #[inline]
    #[must_use]
    pub fn new(id: FlowId, template_uris: impl Into<String>) -> Self {
        Self {
            id,
            template_uris: template_uris.into(),
            schedule: None,
            properties: PropertyBag::new(),
            owning_group: None,
        }
    }

    /// With schedule
    #[inline]
    #[must_use]
    pub fn with_schedule(mut self, schedule: ScheduleSpec) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// With properties
    #[inline]
    #[must_use]
    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties = properties;
        self
    }

    /// With a single property
    #[inline]
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// With owning group
    #[inline]
    #[must_use]
    pub fn with_owning_group(mut self, group: impl Into<String>) -> Self {
        self.owning_group = Some(group.into());
        self
    }

    /// Individual template URIs, trimmed, empty entries skipped
    pub fn template_uri_list(&self) -> impl Iterator<Item = &str> {
        self.template_uris
            .split(',')
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
    }

    /// Check if the flow carries a schedule
    #[inline]
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_some()
    }

    /// Requesters recorded in the reserved property
    ///
    /// # Returns
    /// - `Ok(None)` if no requester list is recorded
    ///
    /// # Errors
    /// Returns error if the recorded list cannot be decoded
    pub fn requesters(&self) -> Result<Option<Vec<ServiceRequester>>, RequesterListError> {
        self.properties
            .get(REQUESTER_LIST_KEY)
            .map(deserialize_requesters)
            .transpose()
    }

    /// Record requesters in the reserved property
    ///
    /// # Errors
    /// Returns error if the list cannot be encoded
    pub fn set_requesters(&mut self, requesters: &[ServiceRequester]) -> Result<(), RequesterListError> {
        let encoded = serialize_requesters(requesters)?;
        self.properties.insert(REQUESTER_LIST_KEY, encoded);
        Ok(())
    }

    /// Content fingerprint of the whole spec
    ///
    /// # Errors
    /// Returns error if the spec cannot be serialized
    pub fn fingerprint(&self) -> Result<SpecFingerprint, FingerprintError> {
        SpecFingerprint::of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::UNSCHEDULE_KEY;
    use pretty_assertions::assert_eq;

    fn sample() -> FlowSpec {
        FlowSpec::new(FlowId::new("testGroup1", "testFlow1"), "FS:///templates/test.template")
            .with_schedule(ScheduleSpec::cron("0 0 12 * * *").with_run_immediately(true))
            .with_property("param1", "value1")
            .with_owning_group("testGroup")
    }

    #[test]
    fn spec_json_round_trip_keeps_reserved_keys() {
        let mut spec = sample().with_property(UNSCHEDULE_KEY, "false");
        spec.set_requesters(&[ServiceRequester::user("testName", "testFrom")])
            .unwrap();

        let json = serde_json::to_string(&spec).unwrap();
        let back: FlowSpec = serde_json::from_str(&json).unwrap();

        assert_eq!(back, spec);
        assert!(back.properties.contains_key(REQUESTER_LIST_KEY));
        assert!(back.properties.contains_key(UNSCHEDULE_KEY));
    }

    #[test]
    fn spec_json_uses_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"]["flowGroup"], "testGroup1");
        assert_eq!(json["templateUris"], "FS:///templates/test.template");
        assert_eq!(json["schedule"]["runImmediately"], true);
        assert_eq!(json["owningGroup"], "testGroup");
    }

    #[test]
    fn unscheduled_spec_omits_schedule() {
        let spec = FlowSpec::new(FlowId::new("g", "n"), "FS:///t");
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json.get("schedule").is_none());
        assert!(!spec.is_scheduled());
    }

    #[test]
    fn template_uri_list_splits_on_commas() {
        let spec = FlowSpec::new(FlowId::new("g", "n"), "FS:///a.template, FS:///b.template,");
        let uris: Vec<_> = spec.template_uri_list().collect();
        assert_eq!(uris, vec!["FS:///a.template", "FS:///b.template"]);
    }

    #[test]
    fn requesters_absent_until_set() {
        let mut spec = sample();
        assert!(spec.requesters().unwrap().is_none());

        let list = vec![ServiceRequester::user("testName", "testFrom")];
        spec.set_requesters(&list).unwrap();
        assert_eq!(spec.requesters().unwrap(), Some(list));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = sample();
        let b = sample().with_property("param2", "value2");
        assert_eq!(a.fingerprint().unwrap(), sample().fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
