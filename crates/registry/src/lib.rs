//! The branch registry
//!
//! Tracks every branch's identity, parent, and status, and answers lineage
//! questions (`does branch B descend from branch A?`) that the query layer
//! needs to resolve edge visibility.
//!
//! Reads never block: every lookup clones an `Arc` out from under a
//! [`parking_lot::RwLock`] and walks it lock-free. Writes (create, rebase,
//! delete) serialize behind a single [`parking_lot::Mutex`] and build a
//! fresh snapshot that they then swap in, so a reader never observes a
//! partially-updated lineage tree.

#![warn(missing_docs)]

pub mod branch;
pub mod lineage;
pub mod registry;

pub use branch::{BranchRecord, BranchStatus};
pub use registry::BranchRegistry;
