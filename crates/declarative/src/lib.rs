//! # Declarative
//!
//! Field-level machinery for declarative resource updates.
//!
//! This crate compares a declared state against a previously observed one
//! and decides whether the difference can be applied in place.
//!
//! ## Core Concepts
//!
//! - **ChangeSet**: the changed top-level fields, each with its old and new value
//! - **FieldCapabilityTable**: which fields are updatable, and which need
//!   dependents quiesced before they change
//! - **classify**: validates a change set against a table
//!
//! ## Example
//!
//! ```
//! use declarative::{ChangeSet, FieldCapabilityTable, classify};
//! use serde_json::json;
//!
//! let table = FieldCapabilityTable::builder()
//!     .updatable(&["name"])
//!     .destructive(&["cluster_home"])
//!     .create_only(&["engine_id"])
//!     .build();
//!
//! let old = json!({"name": "x", "cluster_home": "/a"});
//! let new = json!({"name": "y", "cluster_home": "/b"});
//! let changes = ChangeSet::between(&old, &new);
//!
//! let result = classify(changes.fields(), &table).unwrap();
//! assert!(result.destructive);
//! ```

pub mod capability;
pub mod changeset;
pub mod classify;

// Re-export main types at crate root
pub use capability::{FieldCapability, FieldCapabilityTable, FieldCapabilityTableBuilder};
pub use changeset::{ChangeKind, ChangeSet, ChangeSummary, FieldChange, normalize_field};
pub use classify::{Classification, ValidationError, classify};
