//! Concurrency primitives for the branch-aware graph engine
//!
//! The engine is multi-reader, single-writer-per-branch: any number of
//! queries can run concurrently against any branch, but writes to the same
//! branch serialize behind a per-branch lock so two concurrent writers can
//! never race on the same lineage. Writes to different branches proceed in
//! parallel.
//!
//! This crate owns that lock table ([`BranchLocks`]) plus the retry and
//! deadline helpers that wrap it at call boundaries.

#![warn(missing_docs)]

pub mod deadline;
pub mod locks;
pub mod retry;

pub use deadline::Deadline;
pub use locks::{BranchLocks, WriteGuard};
pub use retry::{retry_conflict, retry_transient, RetryPolicy};
