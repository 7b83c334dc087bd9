//! Core types shared across the branchgraph engine
//!
//! This crate defines the foundational vocabulary used throughout the system:
//! - [`Timestamp`]: monotonic, ISO-8601-serialisable instants
//! - [`contract::BranchName`]: validated, user-facing branch identifiers
//! - [`Uuid`]-backed identity types for nodes, attributes, and relationships
//! - [`Value`]: the tagged-variant literal type stored on `AttributeValue`/`Boolean` nodes
//! - [`GraphError`]/[`GraphResult`]: the shared error taxonomy
//! - [`config::Config`]: environment-sourced settings for the external runner
//!
//! Nothing in this crate touches storage or graph traversal; it is the
//! shared contract the other crates build on.

#![warn(missing_docs)]

pub mod config;
pub mod contract;
pub mod error;
pub mod ids;
pub mod limits;
pub mod value;

pub use config::Config;
pub use contract::{BranchName, BranchNameError, Timestamp, MAX_BRANCH_NAME_LENGTH};
pub use error::{ConstraintReason, ErrorDetails, GraphError, GraphResult, MergeConflictEntry};
pub use ids::{AttributeId, EntityId, RelationshipId};
pub use limits::Limits;
pub use value::{Value, ValueKind};
