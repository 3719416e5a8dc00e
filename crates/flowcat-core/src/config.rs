//! Catalog configuration
//!
//! [`CatalogConfig`] is read from TOML and wires up the store and the identity
//! providers the catalog runs with.

use crate::store::{FsSpecStore, InMemorySpecStore, SpecStore};
use flowcat_auth::{
    ContextRequesterService, GroupFileError, GroupOwnershipService, LocalGroupOwnershipService,
    NoopGroupOwnershipService,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default maximum length of a flow group
pub const DEFAULT_MAX_FLOW_GROUP_LEN: usize = 128;

/// Default maximum length of a flow name
pub const DEFAULT_MAX_FLOW_NAME_LEN: usize = 128;

/// Catalog configuration
///
/// # Example
///
/// ```toml
/// max_flow_group_len = 64
/// template_schemes = ["FS", "GIT"]
/// admin_requesters = ["root"]
///
/// [store]
/// backend = "fs"
/// root = "/var/lib/flowcat"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Maximum length of a flow group
    pub max_flow_group_len: usize,
    /// Maximum length of a flow name
    pub max_flow_name_len: usize,
    /// Allowed template URI schemes, compared case-insensitively
    pub template_schemes: Vec<String>,
    /// Requester names that bypass ownership checks
    pub admin_requesters: Vec<String>,
    /// Spec store backend
    pub store: StoreConfig,
    /// Group membership file; no file means no group members
    pub group_file: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_flow_group_len: DEFAULT_MAX_FLOW_GROUP_LEN,
            max_flow_name_len: DEFAULT_MAX_FLOW_NAME_LEN,
            template_schemes: vec!["FS".to_string()],
            admin_requesters: Vec::new(),
            store: StoreConfig::Memory,
            group_file: None,
        }
    }
}

impl CatalogConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value constraints
    ///
    /// # Errors
    /// Returns error if a bound is zero or no template scheme is allowed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_flow_group_len == 0 || self.max_flow_name_len == 0 {
            return Err(ConfigError::Invalid(
                "flow group and name bounds must be positive".into(),
            ));
        }
        if self.template_schemes.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one template scheme must be allowed".into(),
            ));
        }
        Ok(())
    }

    /// With maximum flow group length
    #[inline]
    #[must_use]
    pub fn with_max_flow_group_len(mut self, len: usize) -> Self {
        self.max_flow_group_len = len;
        self
    }

    /// With maximum flow name length
    #[inline]
    #[must_use]
    pub fn with_max_flow_name_len(mut self, len: usize) -> Self {
        self.max_flow_name_len = len;
        self
    }

    /// With allowed template schemes
    #[must_use]
    pub fn with_template_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template_schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    /// With admin requesters
    #[must_use]
    pub fn with_admin_requesters<I, S>(mut self, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_requesters = admins.into_iter().map(Into::into).collect();
        self
    }

    /// With store backend
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// With group membership file
    #[inline]
    #[must_use]
    pub fn with_group_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.group_file = Some(path.into());
        self
    }

    /// Open the configured spec store
    #[must_use]
    pub fn open_store(&self) -> Arc<dyn SpecStore> {
        match &self.store {
            StoreConfig::Memory => Arc::new(InMemorySpecStore::new()),
            StoreConfig::Fs { root } => Arc::new(FsSpecStore::new(root.clone())),
        }
    }

    /// Build the configured group membership service
    ///
    /// # Errors
    /// Returns error if the group file cannot be loaded
    pub fn group_service(&self) -> Result<Arc<dyn GroupOwnershipService>, ConfigError> {
        Ok(match &self.group_file {
            Some(path) => Arc::new(LocalGroupOwnershipService::from_file(path)?),
            None => Arc::new(NoopGroupOwnershipService),
        })
    }

    /// Build the requester service with the configured admins
    #[must_use]
    pub fn requester_service(&self) -> ContextRequesterService {
        ContextRequesterService::new().with_admins(self.admin_requesters.iter().cloned())
    }
}

/// Spec store backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local map
    #[default]
    Memory,
    /// One JSON file per spec under `root`
    Fs {
        /// Store root directory
        root: PathBuf,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Configuration file
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// TOML did not match the configuration schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value constraint violated
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Group membership file could not be loaded
    #[error(transparent)]
    Groups(#[from] GroupFileError),
}
