//! flowcat Patch Engine
//!
//! Structural partial updates for flow specs.
//!
//! # Core Concepts
//!
//! - [`PatchDocument`]: parsed `$set` / `$delete` tree
//! - [`PatchOperation`]: single field operation
//! - [`PatchMerger`]: pure merge producing a candidate spec
//!
//! # Example
//!
//! ```rust
//! use flowcat_patch::{merge, PatchDocument};
//! use flowcat_spec::{FlowId, FlowSpec};
//!
//! let existing = FlowSpec::new(FlowId::new("g", "n"), "FS:///t.template")
//!     .with_property("param2", "value2")
//!     .with_property("param3", "value3");
//!
//! let patch: PatchDocument =
//!     r#"{"properties":{"$set":{"param2":"value4"},"$delete":["param3"]}}"#.parse().unwrap();
//!
//! let candidate = merge(&existing, &patch).unwrap();
//! assert_eq!(candidate.properties.get("param2"), Some("value4"));
//! assert!(!candidate.properties.contains_key("param3"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod document;
mod error;
mod merge;

pub use document::{PatchDocument, PatchOperation};
pub use error::PatchError;
pub use merge::{merge, PatchMerger};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
