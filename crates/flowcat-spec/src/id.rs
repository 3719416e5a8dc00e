//! Flow identifiers
//!
//! Provides [`FlowId`], the `(group, name)` pair that keys every flow in the catalog.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Unique key of a flow in the catalog
///
/// Immutable once constructed. At most one live spec exists per `FlowId`.
///
/// # Examples
/// - `FlowId::new("etl", "daily-rollup")` → `etl/daily-rollup`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowId {
    #[serde(rename = "flowGroup")]
    group: String,
    #[serde(rename = "flowName")]
    name: String,
}

impl FlowId {
    /// Create new identifier
    #[inline]
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Flow group
    #[inline]
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Flow name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URI-style path of the flow: `/group/name`
    ///
    /// Listeners key compiled artifacts on this path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}/{}", self.group, self.name)
    }
}

impl Display for FlowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

impl FromStr for FlowId {
    type Err = FlowIdError;

    /// Parse `group/name`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, name) = s
            .split_once('/')
            .ok_or_else(|| FlowIdError::MissingSeparator(s.to_string()))?;

        if group.is_empty() || name.is_empty() {
            return Err(FlowIdError::EmptyComponent(s.to_string()));
        }
        if name.contains('/') {
            return Err(FlowIdError::TooManyComponents(s.to_string()));
        }

        Ok(Self::new(group, name))
    }
}

/// Flow identifier parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowIdError {
    /// No `/` between group and name
    #[error("flow id '{0}' must have the form group/name")]
    MissingSeparator(String),

    /// Group or name is empty
    #[error("flow id '{0}' has an empty group or name")]
    EmptyComponent(String),

    /// More than two components
    #[error("flow id '{0}' has more than two components")]
    TooManyComponents(String),
}
