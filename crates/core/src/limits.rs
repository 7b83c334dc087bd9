//! Tunable size limits enforced across the engine
//!
//! Grouped into a single struct, threaded through a [`crate`]-level context
//! rather than read from module-level constants, so tests can exercise
//! boundary conditions without process-wide state.

/// Size limits enforced while validating writes and running the event pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length, in bytes, of a branch name.
    pub max_branch_name_len: usize,
    /// Maximum length, in bytes, of a text attribute value.
    pub max_attribute_text_len: usize,
    /// Maximum number of items in a list-valued attribute.
    pub max_attribute_list_len: usize,
    /// Capacity of the event emitter's write-behind queue, per branch.
    pub event_queue_capacity: usize,
    /// Maximum number of branches a single registry may hold.
    pub max_branches: usize,
}

impl Limits {
    /// Production-sized defaults.
    pub const fn standard() -> Self {
        Limits {
            max_branch_name_len: crate::contract::MAX_BRANCH_NAME_LENGTH,
            max_attribute_text_len: 64 * 1024,
            max_attribute_list_len: 10_000,
            event_queue_capacity: 4_096,
            max_branches: 10_000,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits::standard()
    }
}
