//! Structural validation of flow specs
//!
//! Runs before authorization, so a malformed request never reaches the
//! identity providers or the listeners.

use crate::config::CatalogConfig;
use crate::error::ValidationError;
use flowcat_spec::{FlowId, FlowSpec, ScheduleSpec, NEVER_RUN_CRON};
use std::str::FromStr;

/// Checks identifiers, template URIs and cron schedules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecValidator {
    max_group_len: usize,
    max_name_len: usize,
    template_schemes: Vec<String>,
}

impl Default for SpecValidator {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default())
    }
}

impl SpecValidator {
    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            max_group_len: config.max_flow_group_len,
            max_name_len: config.max_flow_name_len,
            template_schemes: config.template_schemes.clone(),
        }
    }

    /// Validate a whole spec
    ///
    /// # Errors
    /// Returns the first violation found
    pub fn validate_spec(&self, spec: &FlowSpec) -> Result<(), ValidationError> {
        self.validate_id(&spec.id)?;
        self.validate_templates(spec)?;
        if let Some(schedule) = &spec.schedule {
            validate_schedule(schedule)?;
        }
        Ok(())
    }

    /// Validate identifier bounds and characters
    ///
    /// # Errors
    /// Returns [`ValidationError::OutOfRange`] for over-long components
    pub fn validate_id(&self, id: &FlowId) -> Result<(), ValidationError> {
        check_component("flowGroup", id.group(), self.max_group_len)?;
        check_component("flowName", id.name(), self.max_name_len)
    }

    fn validate_templates(&self, spec: &FlowSpec) -> Result<(), ValidationError> {
        let mut any = false;
        for uri in spec.template_uri_list() {
            any = true;
            let parsed = url::Url::parse(uri).map_err(|e| ValidationError::InvalidTemplateUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
            let scheme = parsed.scheme();
            if !self
                .template_schemes
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(scheme))
            {
                return Err(ValidationError::UnsupportedScheme {
                    uri: uri.to_string(),
                    scheme: scheme.to_string(),
                });
            }
        }
        if any {
            Ok(())
        } else {
            Err(ValidationError::MissingTemplateUris)
        }
    }
}

fn check_component(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyComponent { field });
    }
    if len > max {
        return Err(ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            len,
            max,
        });
    }
    if value.contains(['/', '\\', '\0']) {
        return Err(ValidationError::IllegalCharacter {
            field,
            value: value.to_string(),
        });
    }
    if value == "." || value == ".." {
        return Err(ValidationError::ReservedComponent {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate a schedule's cron expression, if any
///
/// # Errors
/// Returns [`ValidationError::InvalidCron`] if the expression does not parse
pub fn validate_schedule(schedule: &ScheduleSpec) -> Result<(), ValidationError> {
    match schedule.cron_expression() {
        Some(expression) => validate_cron(expression),
        None => Ok(()),
    }
}

/// Validate a 5, 6 or 7 field cron expression
///
/// Five-field expressions are read with an implicit `0` seconds field.
///
/// # Errors
/// Returns [`ValidationError::InvalidCron`] if the expression does not parse
pub fn validate_cron(expression: &str) -> Result<(), ValidationError> {
    let trimmed = expression.trim();
    if trimmed == NEVER_RUN_CRON {
        return Ok(());
    }
    let normalized = match trimmed.split_whitespace().count() {
        5 => format!("0 {trimmed}"),
        6 | 7 => trimmed.to_string(),
        n => {
            return Err(ValidationError::InvalidCron {
                expression: expression.to_string(),
                reason: format!("expected 5, 6 or 7 fields, found {n}"),
            })
        }
    };
    cron::Schedule::from_str(&normalized)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidCron {
            expression: expression.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spec(uris: &str) -> FlowSpec {
        FlowSpec::new(FlowId::new("testGroup", "testName"), uris)
    }

    #[test]
    fn accepts_fs_templates_case_insensitively() {
        let validator = SpecValidator::default();
        assert!(validator.validate_spec(&spec("FS:///templates/test.template")).is_ok());
        assert!(validator.validate_spec(&spec("fs:///a.template,FS:///b.template")).is_ok());
    }

    #[test]
    fn rejects_bad_template_uris() {
        let validator = SpecValidator::default();
        assert!(matches!(
            validator.validate_spec(&spec("FILE://bad/uri")),
            Err(ValidationError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            validator.validate_spec(&spec("not a uri")),
            Err(ValidationError::InvalidTemplateUri { .. })
        ));
        assert!(matches!(
            validator.validate_spec(&spec("")),
            Err(ValidationError::MissingTemplateUris)
        ));
    }

    #[test]
    fn extra_schemes_are_configurable() {
        let config = CatalogConfig::default().with_template_schemes(["FS", "git"]);
        let validator = SpecValidator::from_config(&config);
        assert!(validator.validate_spec(&spec("GIT://repo/flow.template")).is_ok());
    }

    #[test]
    fn over_long_ids_are_out_of_range() {
        let validator = SpecValidator::default();
        let long = "a".repeat(129);

        let err = validator
            .validate_id(&FlowId::new(long.clone(), "n"))
            .unwrap_err();
        assert!(err.to_string().contains("is out of range"));

        let err = validator.validate_id(&FlowId::new("g", long)).unwrap_err();
        assert!(err.to_string().contains("is out of range"));

        assert!(validator.validate_id(&FlowId::new("a".repeat(128), "n")).is_ok());
    }

    #[test]
    fn rejects_empty_and_slashed_components() {
        let validator = SpecValidator::default();
        assert!(matches!(
            validator.validate_id(&FlowId::new("", "n")),
            Err(ValidationError::EmptyComponent { field: "flowGroup" })
        ));
        assert!(matches!(
            validator.validate_id(&FlowId::new("g", "a/b")),
            Err(ValidationError::IllegalCharacter { field: "flowName", .. })
        ));
        assert!(matches!(
            validator.validate_id(&FlowId::new("g\\h", "n")),
            Err(ValidationError::IllegalCharacter { field: "flowGroup", .. })
        ));
        assert!(matches!(
            validator.validate_id(&FlowId::new("g", "n\0")),
            Err(ValidationError::IllegalCharacter { field: "flowName", .. })
        ));
    }

    #[test]
    fn rejects_relative_path_components() {
        let validator = SpecValidator::default();
        assert!(matches!(
            validator.validate_id(&FlowId::new("..", "escaped")),
            Err(ValidationError::ReservedComponent { field: "flowGroup", .. })
        ));
        assert!(matches!(
            validator.validate_id(&FlowId::new("g", ".")),
            Err(ValidationError::ReservedComponent { field: "flowName", .. })
        ));
        assert!(validator.validate_id(&FlowId::new("..g", "n.")).is_ok());
    }

    #[test]
    fn cron_forms() {
        assert!(validate_cron("0 0 12 * * *").is_ok());
        assert!(validate_cron("30 9 * * *").is_ok());
        assert!(validate_cron(NEVER_RUN_CRON).is_ok());
        assert!(validate_cron("bad schedule").is_err());
        assert!(validate_cron("0 0 99 * * *").is_err());
    }

    proptest! {
        #[test]
        fn garbage_cron_never_panics(expression in "[a-z0-9*?/ ,-]{0,40}") {
            let _ = validate_cron(&expression);
        }

        #[test]
        fn bounded_ids_pass(group in "[a-zA-Z0-9_.-]{1,128}", name in "[a-zA-Z0-9_.-]{1,128}") {
            prop_assume!(![".", ".."].contains(&group.as_str()) && ![".", ".."].contains(&name.as_str()));
            prop_assert!(SpecValidator::default().validate_id(&FlowId::new(group, name)).is_ok());
        }
    }
}
