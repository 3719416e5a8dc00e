//! Patch documents
//!
//! Provides [`PatchDocument`], a parsed tree of `$set` / `$delete` operations over
//! the fields of a flow spec.
//!
//! # Wire form
//!
//! ```json
//! {
//!   "$set": {"templateUris": "FS:///t.template", "owningGroup": "team"},
//!   "schedule": {"$set": {"runImmediately": true}},
//!   "properties": {"$set": {"param2": "value4"}, "$delete": ["param3"]},
//!   "$baseFingerprint": "…64 hex chars…"
//! }
//! ```

use crate::error::PatchError;
use flowcat_spec::{PropertyBag, ScheduleSpec, SpecFingerprint};
use serde_json::{Map, Value};
use std::str::FromStr;

const SET: &str = "$set";
const DELETE: &str = "$delete";
const BASE_FINGERPRINT: &str = "$baseFingerprint";

/// Single patch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOperation {
    /// Replace template URIs
    SetTemplateUris(String),

    /// Replace owning group
    SetOwningGroup(String),

    /// Replace the whole schedule
    SetSchedule(ScheduleSpec),

    /// Replace the whole property map
    SetProperties(PropertyBag),

    /// Set the cron expression, creating a schedule if absent
    SetCronSchedule(String),

    /// Set the run-immediately flag, creating a schedule if absent
    SetRunImmediately(bool),

    /// Set one property entry
    SetProperty {
        /// Property key
        key: String,
        /// New value
        value: String,
    },

    /// Remove one property entry
    DeleteProperty(String),
}

impl PatchOperation {
    /// Application phase
    ///
    /// Whole-field replacements apply first, then field-level sets, then
    /// deletes. Setting and deleting the same key in one document deletes it.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> u8 {
        match self {
            Self::SetTemplateUris(_)
            | Self::SetOwningGroup(_)
            | Self::SetSchedule(_)
            | Self::SetProperties(_) => 0,
            Self::SetCronSchedule(_) | Self::SetRunImmediately(_) | Self::SetProperty { .. } => 1,
            Self::DeleteProperty(_) => 2,
        }
    }
}

/// Parsed patch document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchDocument {
    operations: Vec<PatchOperation>,
    base_fingerprint: Option<SpecFingerprint>,
}

impl PatchDocument {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation
    #[inline]
    #[must_use]
    pub fn with(mut self, operation: PatchOperation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Set a property entry
    #[inline]
    #[must_use]
    pub fn set_property(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(PatchOperation::SetProperty {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Delete a property entry
    #[inline]
    #[must_use]
    pub fn delete_property(self, key: impl Into<String>) -> Self {
        self.with(PatchOperation::DeleteProperty(key.into()))
    }

    /// Set the run-immediately flag
    #[inline]
    #[must_use]
    pub fn set_run_immediately(self, run_immediately: bool) -> Self {
        self.with(PatchOperation::SetRunImmediately(run_immediately))
    }

    /// Require the existing spec to have this fingerprint
    #[inline]
    #[must_use]
    pub fn with_base_fingerprint(mut self, fingerprint: SpecFingerprint) -> Self {
        self.base_fingerprint = Some(fingerprint);
        self
    }

    /// Operations in document order
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    /// Expected fingerprint of the existing spec
    #[inline]
    #[must_use]
    pub fn base_fingerprint(&self) -> Option<&SpecFingerprint> {
        self.base_fingerprint.as_ref()
    }

    /// Number of operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if document has no operations
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Parse from a JSON value
    ///
    /// # Errors
    /// Returns error if the document addresses unknown or immutable fields,
    /// deletes anything other than property entries, or carries wrongly typed
    /// values
    pub fn from_json(value: &Value) -> Result<Self, PatchError> {
        let root = as_object(value, "")?;
        let mut doc = Self::new();

        for (field, node) in root {
            match field.as_str() {
                SET => doc.parse_root_set(node)?,
                DELETE => return Err(PatchError::UnsupportedDelete(first_name(node))),
                BASE_FINGERPRINT => {
                    let hex = node
                        .as_str()
                        .ok_or_else(|| PatchError::invalid_value(BASE_FINGERPRINT, "a string"))?;
                    let fingerprint = SpecFingerprint::from_str(hex)
                        .map_err(|e| PatchError::InvalidFingerprint(e.to_string()))?;
                    doc.base_fingerprint = Some(fingerprint);
                }
                "schedule" => doc.parse_schedule(node)?,
                "properties" => doc.parse_properties(node)?,
                "id" => return Err(PatchError::ImmutableField("id".to_string())),
                "templateUris" | "owningGroup" => {
                    return Err(PatchError::ScalarNeedsSet(field.clone()))
                }
                other => return Err(PatchError::UnknownField(other.to_string())),
            }
        }

        Ok(doc)
    }

    fn parse_root_set(&mut self, node: &Value) -> Result<(), PatchError> {
        for (field, value) in as_object(node, SET)? {
            let op = match field.as_str() {
                "templateUris" => PatchOperation::SetTemplateUris(as_string(value, "templateUris")?),
                "owningGroup" => PatchOperation::SetOwningGroup(as_string(value, "owningGroup")?),
                "schedule" => PatchOperation::SetSchedule(
                    serde_json::from_value(value.clone())
                        .map_err(|_| PatchError::invalid_value("schedule", "a schedule object"))?,
                ),
                "properties" => PatchOperation::SetProperties(
                    serde_json::from_value(value.clone())
                        .map_err(|_| PatchError::invalid_value("properties", "a string map"))?,
                ),
                "id" => return Err(PatchError::ImmutableField("id".to_string())),
                other => return Err(PatchError::UnknownField(other.to_string())),
            };
            self.operations.push(op);
        }
        Ok(())
    }

    fn parse_schedule(&mut self, node: &Value) -> Result<(), PatchError> {
        for (key, value) in as_object(node, "schedule")? {
            match key.as_str() {
                SET => {
                    for (field, v) in as_object(value, "schedule.$set")? {
                        let op = match field.as_str() {
                            "cronSchedule" => PatchOperation::SetCronSchedule(as_string(
                                v,
                                "schedule.cronSchedule",
                            )?),
                            "runImmediately" => PatchOperation::SetRunImmediately(
                                v.as_bool().ok_or_else(|| {
                                    PatchError::invalid_value("schedule.runImmediately", "a boolean")
                                })?,
                            ),
                            other => {
                                return Err(PatchError::UnknownField(format!("schedule.{other}")))
                            }
                        };
                        self.operations.push(op);
                    }
                }
                DELETE => {
                    return Err(PatchError::UnsupportedDelete(format!(
                        "schedule.{}",
                        first_name(value)
                    )))
                }
                other => return Err(PatchError::UnknownField(format!("schedule.{other}"))),
            }
        }
        Ok(())
    }

    fn parse_properties(&mut self, node: &Value) -> Result<(), PatchError> {
        for (key, value) in as_object(node, "properties")? {
            match key.as_str() {
                SET => {
                    for (prop, v) in as_object(value, "properties.$set")? {
                        let value = as_string(v, &format!("properties.{prop}"))?;
                        self.operations.push(PatchOperation::SetProperty {
                            key: prop.clone(),
                            value,
                        });
                    }
                }
                DELETE => {
                    let keys = value.as_array().ok_or_else(|| {
                        PatchError::invalid_value("properties.$delete", "a list of keys")
                    })?;
                    for k in keys {
                        let k = as_string(k, "properties.$delete")?;
                        self.operations.push(PatchOperation::DeleteProperty(k));
                    }
                }
                other => return Err(PatchError::UnknownField(format!("properties.{other}"))),
            }
        }
        Ok(())
    }
}

impl FromStr for PatchDocument {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| PatchError::InvalidJson(e.to_string()))?;
        Self::from_json(&value)
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, PatchError> {
    value
        .as_object()
        .ok_or_else(|| PatchError::NotAnObject(path.to_string()))
}

fn as_string(value: &Value, path: &str) -> Result<String, PatchError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PatchError::invalid_value(path, "a string"))
}

/// Name of the first field a `$delete` node targets, for error messages
fn first_name(node: &Value) -> String {
    node.as_array()
        .and_then(|items| items.first())
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_schedule_and_property_operations() {
        let doc: PatchDocument = r#"{"schedule":{"$set":{"runImmediately":true}},
            "properties":{"$set":{"param2":"value4"},"$delete":["param3"]}}"#
            .parse()
            .unwrap();

        assert_eq!(doc.len(), 3);
        assert!(doc
            .operations()
            .contains(&PatchOperation::SetRunImmediately(true)));
        assert!(doc.operations().contains(&PatchOperation::SetProperty {
            key: "param2".to_string(),
            value: "value4".to_string(),
        }));
        assert!(doc
            .operations()
            .contains(&PatchOperation::DeleteProperty("param3".to_string())));
    }

    #[test]
    fn parses_root_set() {
        let doc = PatchDocument::from_json(&json!({
            "$set": {"templateUris": "FS:///b.template", "owningGroup": "team"}
        }))
        .unwrap();

        assert_eq!(doc.len(), 2);
        assert!(doc
            .operations()
            .contains(&PatchOperation::SetOwningGroup("team".to_string())));
        assert!(doc
            .operations()
            .contains(&PatchOperation::SetTemplateUris("FS:///b.template".to_string())));
    }

    #[test]
    fn rejects_structural_delete() {
        let err = PatchDocument::from_json(&json!({"$delete": ["owningGroup"]})).unwrap_err();
        assert_eq!(err, PatchError::UnsupportedDelete("owningGroup".to_string()));

        let err = PatchDocument::from_json(&json!({"schedule": {"$delete": ["cronSchedule"]}}))
            .unwrap_err();
        assert!(matches!(err, PatchError::UnsupportedDelete(_)));
    }

    #[test]
    fn rejects_id_changes() {
        let err = PatchDocument::from_json(&json!({"$set": {"id": {"flowGroup": "x"}}})).unwrap_err();
        assert_eq!(err, PatchError::ImmutableField("id".to_string()));

        let err = PatchDocument::from_json(&json!({"id": {"$set": {"flowName": "y"}}})).unwrap_err();
        assert_eq!(err, PatchError::ImmutableField("id".to_string()));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_types() {
        assert!(matches!(
            PatchDocument::from_json(&json!({"color": {"$set": {}}})),
            Err(PatchError::UnknownField(_))
        ));
        assert!(matches!(
            PatchDocument::from_json(&json!({"properties": {"$set": {"n": 1}}})),
            Err(PatchError::InvalidValue { .. })
        ));
        assert!(matches!(
            PatchDocument::from_json(&json!({"schedule": {"$set": {"runImmediately": "yes"}}})),
            Err(PatchError::InvalidValue { .. })
        ));
        assert!(matches!(
            PatchDocument::from_json(&json!({"templateUris": {"$set": "x"}})),
            Err(PatchError::ScalarNeedsSet(_))
        ));
        assert!(matches!(
            PatchDocument::from_json(&json!([1, 2])),
            Err(PatchError::NotAnObject(_))
        ));
    }

    #[test]
    fn parses_base_fingerprint() {
        let fp = SpecFingerprint::compute(b"spec");
        let doc = PatchDocument::from_json(&json!({"$baseFingerprint": fp.to_string()})).unwrap();
        assert_eq!(doc.base_fingerprint(), Some(&fp));

        assert!(matches!(
            PatchDocument::from_json(&json!({"$baseFingerprint": "nothex"})),
            Err(PatchError::InvalidFingerprint(_))
        ));
    }

    #[test]
    fn phases_order_replacements_sets_deletes() {
        assert!(
            PatchOperation::SetProperties(PropertyBag::new()).phase()
                < PatchOperation::SetRunImmediately(true).phase()
        );
        assert!(
            PatchOperation::SetRunImmediately(true).phase()
                < PatchOperation::DeleteProperty("k".into()).phase()
        );
    }
}
