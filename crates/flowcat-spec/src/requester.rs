//! Caller identities
//!
//! Provides [`ServiceRequester`] and the serialized requester-list format stored
//! under [`crate::REQUESTER_LIST_KEY`].

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind of principal behind a requester
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrincipalType {
    /// Human user
    User,
    /// Service account
    Service,
    /// Unresolved principal
    Unknown,
    /// Any other principal type reported by the identity layer
    Other(String),
}

impl PrincipalType {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "USER_PRINCIPAL",
            Self::Service => "SERVICE_PRINCIPAL",
            Self::Unknown => "UNKNOWN",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for PrincipalType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "USER_PRINCIPAL" => Self::User,
            "SERVICE_PRINCIPAL" => Self::Service,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for PrincipalType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<PrincipalType> for String {
    fn from(value: PrincipalType) -> Self {
        match value {
            PrincipalType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for PrincipalType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a caller
///
/// Equality is structural over name, principal type and origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRequester {
    /// Principal name
    pub name: String,
    /// Principal type
    #[serde(rename = "type")]
    pub principal_type: PrincipalType,
    /// Where the request came from
    pub from: String,
}

impl ServiceRequester {
    /// Create new requester
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        principal_type: impl Into<PrincipalType>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            principal_type: principal_type.into(),
            from: from.into(),
        }
    }

    /// Human user requester
    #[inline]
    #[must_use]
    pub fn user(name: impl Into<String>, from: impl Into<String>) -> Self {
        Self::new(name, PrincipalType::User, from)
    }
}

impl Display for ServiceRequester {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})@{}", self.name, self.principal_type, self.from)
    }
}

/// Requester-list encoding errors
#[derive(Debug, thiserror::Error)]
pub enum RequesterListError {
    /// The stored value is not a valid requester list
    #[error("invalid requester list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encode a requester list for storage in a property bag
///
/// # Errors
/// Returns error if JSON encoding fails
pub fn serialize_requesters(requesters: &[ServiceRequester]) -> Result<String, RequesterListError> {
    Ok(serde_json::to_string(requesters)?)
}

/// Decode a requester list read from a property bag
///
/// # Errors
/// Returns error if the value is not a JSON list of requesters
pub fn deserialize_requesters(encoded: &str) -> Result<Vec<ServiceRequester>, RequesterListError> {
    Ok(serde_json::from_str(encoded)?)
}
