//! flowcat Spec Types
//!
//! Immutable value types shared by every layer of the flow catalog.
//!
//! # Core Concepts
//!
//! - [`FlowId`]: `(group, name)` catalog key
//! - [`ScheduleSpec`]: cron / run-immediately descriptor
//! - [`PropertyBag`]: open-ended string map with reserved keys
//! - [`FlowSpec`]: the persisted definition of a flow
//! - [`ServiceRequester`]: caller identity recorded for authorization
//! - [`ExecutionId`]: identifier of a triggered run
//! - [`SpecFingerprint`]: content digest used to compare stored states
//!
//! # Example
//!
//! ```rust
//! use flowcat_spec::{FlowId, FlowSpec, ScheduleSpec};
//!
//! let spec = FlowSpec::new(FlowId::new("etl", "rollup"), "FS:///templates/rollup.template")
//!     .with_schedule(ScheduleSpec::cron("0 0 12 * * *"))
//!     .with_property("param1", "value1");
//!
//! assert!(spec.is_scheduled());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod execution;
mod fingerprint;
mod id;
mod properties;
mod requester;
mod schedule;
mod spec;

pub use execution::ExecutionId;
pub use fingerprint::{FingerprintError, SpecFingerprint};
pub use id::{FlowId, FlowIdError};
pub use properties::{PropertyBag, REQUESTER_LIST_KEY, RESERVED_KEYS, UNSCHEDULE_KEY};
pub use requester::{
    deserialize_requesters, serialize_requesters, PrincipalType, RequesterListError,
    ServiceRequester,
};
pub use schedule::{ScheduleSpec, NEVER_RUN_CRON};
pub use spec::FlowSpec;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
