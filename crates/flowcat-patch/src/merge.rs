//! Functional patch merge
//!
//! Provides [`PatchMerger`], which builds a candidate spec from an existing one
//! and a [`PatchDocument`] without touching the original.

use crate::document::{PatchDocument, PatchOperation};
use crate::error::PatchError;
use flowcat_spec::{FlowSpec, ScheduleSpec};

/// Applies patch documents to flow specs
///
/// # Characteristics
/// - Pure: `existing` is never mutated, callers discard the candidate on rejection
/// - Phased: replacements, then field sets, then deletes
/// - Optional optimistic check against `$baseFingerprint`
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchMerger;

impl PatchMerger {
    /// Create new merger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produce the candidate spec
    ///
    /// # Errors
    /// Returns [`PatchError::BaseMismatch`] if the document carries a base
    /// fingerprint that does not match `existing`
    pub fn merge(&self, existing: &FlowSpec, patch: &PatchDocument) -> Result<FlowSpec, PatchError> {
        if let Some(expected) = patch.base_fingerprint() {
            let actual = existing
                .fingerprint()
                .map_err(|e| PatchError::InvalidFingerprint(e.to_string()))?;
            if *expected != actual {
                return Err(PatchError::BaseMismatch {
                    expected: *expected,
                    actual,
                });
            }
        }

        let mut ordered: Vec<&PatchOperation> = patch.operations().iter().collect();
        // Stable: document order is kept within a phase
        ordered.sort_by_key(|op| op.phase());

        Ok(ordered
            .into_iter()
            .fold(existing.clone(), |candidate, op| Self::apply_single(candidate, op)))
    }

    fn apply_single(mut spec: FlowSpec, op: &PatchOperation) -> FlowSpec {
        match op {
            PatchOperation::SetTemplateUris(uris) => spec.template_uris.clone_from(uris),
            PatchOperation::SetOwningGroup(group) => spec.owning_group = Some(group.clone()),
            PatchOperation::SetSchedule(schedule) => spec.schedule = Some(schedule.clone()),
            PatchOperation::SetProperties(properties) => spec.properties = properties.clone(),
            PatchOperation::SetCronSchedule(cron) => {
                spec.schedule.get_or_insert_with(ScheduleSpec::default).cron_schedule =
                    Some(cron.clone());
            }
            PatchOperation::SetRunImmediately(flag) => {
                spec.schedule
                    .get_or_insert_with(ScheduleSpec::default)
                    .run_immediately = *flag;
            }
            PatchOperation::SetProperty { key, value } => {
                spec.properties.insert(key.clone(), value.clone());
            }
            PatchOperation::DeleteProperty(key) => {
                spec.properties.remove(key);
            }
        }
        spec
    }
}

/// Merge with the default [`PatchMerger`]
///
/// # Errors
/// See [`PatchMerger::merge`]
#[inline]
pub fn merge(existing: &FlowSpec, patch: &PatchDocument) -> Result<FlowSpec, PatchError> {
    PatchMerger::new().merge(existing, patch)
}
