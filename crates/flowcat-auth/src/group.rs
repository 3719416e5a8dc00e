//! Group ownership
//!
//! Provides [`GroupOwnershipService`] and two implementations: one that knows
//! no groups and one backed by a local JSON membership file.

use flowcat_spec::ServiceRequester;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Group membership lookup
pub trait GroupOwnershipService: Send + Sync {
    /// Check whether `requester_name` belongs to `group`
    fn is_member(&self, group: &str, requester_name: &str) -> bool;

    /// Check whether any of `requesters` belongs to `group`
    fn is_member_of_group(&self, requesters: &[ServiceRequester], group: &str) -> bool {
        requesters.iter().any(|r| self.is_member(group, &r.name))
    }

    /// Re-read membership from its source, if it has one
    ///
    /// # Errors
    /// Returns error if the source cannot be read; membership is then unchanged
    fn reload(&self) -> Result<(), GroupFileError> {
        Ok(())
    }
}

/// No one is a member of any group
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGroupOwnershipService;

impl GroupOwnershipService for NoopGroupOwnershipService {
    fn is_member(&self, _group: &str, _requester_name: &str) -> bool {
        false
    }
}

type Membership = HashMap<String, HashSet<String>>;

/// Membership read from a local JSON file
///
/// File format: `{"group": "member1,member2"}`.
#[derive(Debug)]
pub struct LocalGroupOwnershipService {
    source: Option<PathBuf>,
    groups: RwLock<Membership>,
}

impl LocalGroupOwnershipService {
    /// Load membership from a file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GroupFileError> {
        let path = path.as_ref().to_path_buf();
        let groups = read_membership(&path)?;
        tracing::debug!("Loaded {} groups from {}", groups.len(), path.display());
        Ok(Self {
            source: Some(path),
            groups: RwLock::new(groups),
        })
    }

    /// Parse membership from a JSON string
    ///
    /// # Errors
    /// Returns error if the JSON is not a map of group → member list
    pub fn from_json_str(json: &str) -> Result<Self, GroupFileError> {
        Ok(Self {
            source: None,
            groups: RwLock::new(parse_membership(json)?),
        })
    }

    /// Build from in-memory membership
    #[must_use]
    pub fn from_members<I, G, M>(groups: I) -> Self
    where
        I: IntoIterator<Item = (G, Vec<M>)>,
        G: Into<String>,
        M: Into<String>,
    {
        let groups = groups
            .into_iter()
            .map(|(g, members)| (g.into(), members.into_iter().map(Into::into).collect()))
            .collect();
        Self {
            source: None,
            groups: RwLock::new(groups),
        }
    }
}

impl GroupOwnershipService for LocalGroupOwnershipService {
    fn is_member(&self, group: &str, requester_name: &str) -> bool {
        self.groups
            .read()
            .get(group)
            .is_some_and(|members| members.contains(requester_name))
    }

    fn reload(&self) -> Result<(), GroupFileError> {
        let Some(path) = &self.source else {
            return Ok(());
        };
        let groups = read_membership(path)?;
        tracing::debug!("Reloaded {} groups from {}", groups.len(), path.display());
        *self.groups.write() = groups;
        Ok(())
    }
}

fn read_membership(path: &Path) -> Result<Membership, GroupFileError> {
    let json = std::fs::read_to_string(path).map_err(|source| GroupFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_membership(&json)
}

fn parse_membership(json: &str) -> Result<Membership, GroupFileError> {
    let raw: HashMap<String, String> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|(group, members)| {
            let members = members
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            (group, members)
        })
        .collect())
}

/// Errors loading group membership
#[derive(Debug, thiserror::Error)]
pub enum GroupFileError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Group file
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// File is not a JSON map of group → comma-separated members
    #[error("invalid group file: {0}")]
    Parse(#[from] serde_json::Error),
}
