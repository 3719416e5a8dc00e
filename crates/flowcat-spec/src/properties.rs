//! Flow property bags
//!
//! Provides [`PropertyBag`], the open-ended string map carried by every flow,
//! and the reserved keys the catalog interprets.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Unschedule directive
///
/// A value of `"true"` moves the flow to the never-run schedule. The key
/// itself is never persisted.
pub const UNSCHEDULE_KEY: &str = "flow.unschedule";

/// Serialized list of requesters associated with a flow
///
/// Recovered from persisted properties for write authorization.
pub const REQUESTER_LIST_KEY: &str = "flow.requesterList";

/// Keys with protocol meaning to the catalog
pub const RESERVED_KEYS: [&str; 2] = [UNSCHEDULE_KEY, REQUESTER_LIST_KEY];

/// String → string properties of a flow
///
/// Ordering is irrelevant to callers; entries are kept sorted so the
/// serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, String>);

impl PropertyBag {
    /// Create empty bag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Get a property value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert a property, returning the previous value
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a property, returning its value
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Check if key is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of properties
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if bag is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check whether the unschedule directive is set to true
    #[must_use]
    pub fn unschedule_requested(&self) -> bool {
        self.get(UNSCHEDULE_KEY)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Properties without reserved keys
    #[must_use]
    pub fn user_properties(&self) -> Self {
        self.0
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl FromIterator<(String, String)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl IntoIterator for PropertyBag {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
