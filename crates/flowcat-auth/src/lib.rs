//! flowcat Authorization
//!
//! Identity, group ownership and the write-authorization rules for flow specs.
//!
//! # Core Concepts
//!
//! - [`RequesterService`]: resolves caller identities from a [`RequestContext`]
//! - [`GroupOwnershipService`]: answers group membership questions
//! - [`AuthorizationEngine`]: allows or denies create, update and delete
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use flowcat_auth::{
//!     AuthorizationEngine, AuthorizationRequest, ContextRequesterService,
//!     LocalGroupOwnershipService, RequestContext, RequesterService,
//! };
//!
//! let groups = LocalGroupOwnershipService::from_json_str(r#"{"ops":"alice"}"#).unwrap();
//! let requesters = Arc::new(ContextRequesterService::new());
//! let engine = AuthorizationEngine::new(Arc::new(groups), requesters.clone());
//!
//! let caller = requesters.find_requesters(&RequestContext::user("alice", "cli"));
//! assert!(engine.authorize(&AuthorizationRequest::create(Some("ops")), &caller).is_allowed());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod engine;
mod group;
mod requester;

pub use engine::{Action, AuthorizationEngine, AuthorizationRequest, Decision, DenyReason};
pub use group::{
    GroupFileError, GroupOwnershipService, LocalGroupOwnershipService, NoopGroupOwnershipService,
};
pub use requester::{ContextRequesterService, RequestContext, RequesterService};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
