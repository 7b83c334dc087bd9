//! The in-process facade over the branch-aware graph engine
//!
//! [`Context`] wires a graph store, branch registry, schema cache, event
//! emitter, and lock table into one value, then exposes the operations
//! named in the external-interfaces contract as plain async methods
//! (`branch_create`, `node_query`, `diff_summary`, ...) over owned,
//! `serde`-derived request/response types in [`types`]. Nothing in this
//! crate assumes a transport: a GraphQL resolver, a REST handler, or a
//! test harness all call the same methods.

#![warn(missing_docs)]

pub mod context;
pub mod facade;
pub mod types;

pub use context::Context;
pub use types::{
    AttributeDiffSummary, BranchSummary, BranchUpdate, DiffActionWire, DiffSummary, NewBranch,
    NewNode, NodeDiffSummary, NodeFilterRequest, NodeQuery, NodeSummary, RelationshipDiffSummary,
};
