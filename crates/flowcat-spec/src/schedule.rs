//! Flow schedules
//!
//! Provides [`ScheduleSpec`], the cron / run-immediately descriptor of a flow.

use serde::{Deserialize, Serialize};

/// Cron expression that never fires
///
/// Marks a flow as unscheduled while keeping it in the catalog.
pub const NEVER_RUN_CRON: &str = "0 0 0 ? 1 1 2050";

/// When a flow runs
///
/// # Invariants
/// - A present `cron_schedule` parses as a cron expression (checked on admission)
/// - An absent `cron_schedule` means "run once, not recurring"
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    /// Cron expression, if recurring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_schedule: Option<String>,

    /// Request an out-of-band run in addition to the cadence
    #[serde(default)]
    pub run_immediately: bool,
}

impl ScheduleSpec {
    /// Recurring schedule
    #[inline]
    #[must_use]
    pub fn cron(expression: impl Into<String>) -> Self {
        Self {
            cron_schedule: Some(expression.into()),
            run_immediately: false,
        }
    }

    /// Unscheduled sentinel
    #[inline]
    #[must_use]
    pub fn never_run() -> Self {
        Self::cron(NEVER_RUN_CRON)
    }

    /// Set the run-immediately flag
    #[inline]
    #[must_use]
    pub fn with_run_immediately(mut self, run_immediately: bool) -> Self {
        self.run_immediately = run_immediately;
        self
    }

    /// Cron expression, if any
    #[inline]
    #[must_use]
    pub fn cron_expression(&self) -> Option<&str> {
        self.cron_schedule.as_deref()
    }

    /// Check for the unscheduled sentinel
    #[inline]
    #[must_use]
    pub fn is_never_run(&self) -> bool {
        self.cron_schedule.as_deref() == Some(NEVER_RUN_CRON)
    }
}
