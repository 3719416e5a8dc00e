//! flowcat Core
//!
//! The flow catalog: validated, authorized, atomically committed flow specs.
//!
//! # Architecture
//!
//! ```text
//! request ──► validate ──► authorize ──► (merge patch) ──► listeners ──► store
//!                │             │                               │
//!                ▼             ▼                               ▼
//!           422 error     401 error                       400 error
//! ```
//!
//! # Core Concepts
//!
//! - [`FlowCatalog`]: owns the store and runs the mutation protocol
//! - [`SpecStore`]: persistence seam, in memory or on disk
//! - [`SpecCatalogListener`]: compilation gate consulted before commit
//! - [`FlowConfigApi`]: transport-facing facade with status codes
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowcat_auth::RequestContext;
//! use flowcat_core::{CatalogConfig, FlowCatalog};
//! use flowcat_spec::{FlowId, FlowSpec};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(FlowCatalog::from_config(&CatalogConfig::default())?);
//! catalog.start().await?;
//!
//! let spec = FlowSpec::new(FlowId::new("etl", "rollup"), "FS:///templates/rollup.template");
//! let commit = catalog.create(spec, &RequestContext::user("alice", "cli")).await?;
//! assert!(commit.execution_id.is_run());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod lifecycle;
pub mod listener;
pub mod locks;
pub mod store;
pub mod validation;

pub use api::{ApiError, ApiResult, FlowConfigApi, FlowStatusId};
pub use catalog::{FlowCatalog, FlowCommit};
pub use config::{CatalogConfig, ConfigError, StoreConfig};
pub use error::{CatalogError, CatalogResult, ErrorClass, ValidationError, COMPILATION_FAILED};
pub use lifecycle::ServiceState;
pub use listener::{AddSpecResponse, ListenerRegistry, Rejection, SpecCatalogListener};
pub use store::{FsSpecStore, InMemorySpecStore, SpecStore, StoreError};
pub use validation::SpecValidator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
