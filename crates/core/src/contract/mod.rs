//! Contract types for the branch-aware temporal graph
//!
//! - `timestamp`: wall-clock instants used for edge validity intervals
//! - `branch_name`: user-facing branch identifiers and their grammar

pub mod branch_name;
pub mod timestamp;

pub use branch_name::{BranchName, BranchNameError, MAX_BRANCH_NAME_LENGTH};
pub use timestamp::Timestamp;
