//! Patch errors

use flowcat_spec::SpecFingerprint;

/// Errors while parsing or merging a patch document
///
/// Every variant except [`PatchError::BaseMismatch`] means the document itself
/// is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// Document is not valid JSON
    #[error("patch is not valid JSON: {0}")]
    InvalidJson(String),

    /// Expected a JSON object at path
    #[error("expected an object at '{0}'")]
    NotAnObject(String),

    /// Field not known to the flow spec
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Field cannot be changed by a patch
    #[error("field '{0}' is immutable")]
    ImmutableField(String),

    /// `$delete` on something other than a property map entry
    #[error("deleting '{0}' is not supported; only property entries can be deleted")]
    UnsupportedDelete(String),

    /// Scalar field addressed with a nested patch instead of `$set`
    #[error("field '{0}' must be patched with $set")]
    ScalarNeedsSet(String),

    /// Value has the wrong type
    #[error("invalid value at '{path}': expected {expected}")]
    InvalidValue {
        /// Dotted path of the value
        path: String,
        /// Expected JSON type
        expected: &'static str,
    },

    /// `$baseFingerprint` is not a valid fingerprint
    #[error("invalid base fingerprint: {0}")]
    InvalidFingerprint(String),

    /// The existing spec changed since the patch was prepared
    #[error("base fingerprint mismatch: expected {expected}, got {actual}")]
    BaseMismatch {
        /// Fingerprint the patch was prepared against
        expected: SpecFingerprint,
        /// Fingerprint of the stored spec
        actual: SpecFingerprint,
    },
}

impl PatchError {
    /// Create invalid value error
    #[inline]
    pub fn invalid_value(path: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidValue {
            path: path.into(),
            expected,
        }
    }

    /// Check if the error is a concurrency conflict rather than a malformed document
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::BaseMismatch { .. })
    }
}
