//! Error types for the flow catalog
//!
//! Every catalog failure maps onto one [`ErrorClass`], which transports turn
//! into a status code.

use crate::lifecycle::ServiceState;
use crate::store::StoreError;
use flowcat_auth::DenyReason;
use flowcat_patch::PatchError;
use flowcat_spec::FlowId;

/// Message prefix of every compilation rejection
pub const COMPILATION_FAILED: &str = "Flow was not compiled successfully.";

/// Main catalog error type
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Request failed structural validation
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Caller may not perform the mutation
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] DenyReason),

    /// A compilation listener refused the candidate
    #[error("Flow was not compiled successfully. {flow} rejected by {listener}: {message}")]
    CompilationRejected {
        /// Flow the candidate belongs to
        flow: FlowId,
        /// Listener that refused
        listener: String,
        /// Listener's reason
        message: String,
    },

    /// No spec stored under the id
    #[error("flow {0} does not exist")]
    NotFound(FlowId),

    /// Create of an id that is already stored
    #[error("flow {0} already exists")]
    AlreadyExists(FlowId),

    /// Stored state changed under the request
    #[error("conflict: {0}")]
    Conflict(String),

    /// Spec store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Catalog is not accepting operations
    #[error("catalog is not running (state: {0})")]
    NotRunning(ServiceState),

    /// Illegal lifecycle transition
    #[error("cannot move catalog from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: ServiceState,
        /// Requested state
        to: ServiceState,
    },

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Failure class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Unprocessable,
            Self::Unauthorized(_) => ErrorClass::Unauthorized,
            Self::CompilationRejected { .. } => ErrorClass::BadRequest,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::AlreadyExists(_) | Self::Conflict(_) => ErrorClass::Conflict,
            Self::NotRunning(_) | Self::InvalidTransition { .. } => ErrorClass::Unavailable,
            Self::Store(_) | Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Check if a caller could reasonably retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotRunning(_) => true,
            Self::Store(e) => e.is_io(),
            _ => false,
        }
    }

    /// HTTP-style status code
    #[inline]
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.class().http_status()
    }
}

impl From<PatchError> for CatalogError {
    fn from(err: PatchError) -> Self {
        if err.is_conflict() {
            Self::Conflict(err.to_string())
        } else {
            Self::Validation(ValidationError::MalformedPatch(err))
        }
    }
}

/// Structural validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Identifier component longer than allowed
    #[error("{field} '{value}' is out of range: length {len} exceeds {max}")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// Value as given
        value: String,
        /// Length in characters
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Identifier component is empty
    #[error("{field} must not be empty")]
    EmptyComponent {
        /// Offending field
        field: &'static str,
    },

    /// Identifier component contains a separator or control character
    #[error("{field} '{value}' must not contain '/', '\\' or NUL")]
    IllegalCharacter {
        /// Offending field
        field: &'static str,
        /// Value as given
        value: String,
    },

    /// Identifier component is a relative path segment
    #[error("{field} must not be '{value}'")]
    ReservedComponent {
        /// Offending field
        field: &'static str,
        /// `.` or `..`
        value: String,
    },

    /// No template URI given
    #[error("templateUris must not be empty")]
    MissingTemplateUris,

    /// Template URI does not parse
    #[error("invalid template URI '{uri}': {reason}")]
    InvalidTemplateUri {
        /// URI as given
        uri: String,
        /// Parser message
        reason: String,
    },

    /// Template URI scheme is not in the allow-list
    #[error("template URI '{uri}' has unsupported scheme '{scheme}'")]
    UnsupportedScheme {
        /// URI as given
        uri: String,
        /// Scheme found
        scheme: String,
    },

    /// Cron expression does not parse
    #[error("invalid cron schedule '{expression}': {reason}")]
    InvalidCron {
        /// Expression as given
        expression: String,
        /// Parser message
        reason: String,
    },

    /// Requester list property cannot be decoded
    #[error("malformed requester list: {0}")]
    MalformedRequesterList(String),

    /// Patch document rejected
    #[error("malformed patch: {0}")]
    MalformedPatch(PatchError),
}

/// Failure class of a catalog error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Validation or malformed patch
    Unprocessable,
    /// Authorization denied
    Unauthorized,
    /// Compilation rejected
    BadRequest,
    /// Missing flow
    NotFound,
    /// Duplicate create or stale base
    Conflict,
    /// Catalog not running
    Unavailable,
    /// Store or internal failure
    Internal,
}

impl ErrorClass {
    /// HTTP-style status code
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Unprocessable => 422,
            Self::Unauthorized => 401,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Unavailable => 503,
            Self::Internal => 500,
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
