//! Execution identifiers

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identifier of a flow run
///
/// [`ExecutionId::NOT_RUN`] (`-1`) means nothing was triggered synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(i64);

impl ExecutionId {
    /// The flow was scheduled or deferred, not run
    pub const NOT_RUN: Self = Self(-1);

    /// Wrap a raw value
    #[inline]
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Check if a run was triggered
    #[inline]
    #[must_use]
    pub const fn is_run(self) -> bool {
        self.0 > 0
    }
}

impl Display for ExecutionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
