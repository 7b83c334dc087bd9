//! A single branch's registry record

use branchgraph_core::{BranchName, EntityId, Timestamp};

/// Lifecycle state of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    /// Open for reads and writes.
    Active,
    /// Soft-deleted: retained for audit/lineage purposes but hidden from
    /// listings and no longer a valid write target.
    Deleted,
}

/// The registry's record of one branch.
#[derive(Debug, Clone)]
pub struct BranchRecord {
    /// Stable internal identity.
    pub id: EntityId,
    /// Human-chosen, validated name.
    pub name: BranchName,
    /// Parent branch, or `None` for the default (root) branch.
    pub parent: Option<EntityId>,
    /// Distance from the default branch along the parent chain.
    ///
    /// Used as the first tiebreaker when two edges' validity windows
    /// overlap: the branch further from the root wins.
    pub branch_level: u32,
    /// When this branch was created. Never changes after creation.
    pub created_at: Timestamp,
    /// The fork point this branch's diffs and merges are measured from.
    ///
    /// Starts equal to `created_at`; `rebase` advances it to the rebase
    /// instant, since re-parenting changes what "changed since the fork"
    /// means for this branch's own diff/merge window.
    pub branched_from: Timestamp,
    /// Current lifecycle state.
    pub status: BranchStatus,
    /// Free-form user-supplied description, settable via `BranchUpdate`.
    pub description: Option<String>,
}

impl BranchRecord {
    /// Build the default (root) branch record.
    pub fn root(name: BranchName, id: EntityId, created_at: Timestamp) -> Self {
        BranchRecord {
            id,
            name,
            parent: None,
            branch_level: 0,
            created_at,
            branched_from: created_at,
            status: BranchStatus::Active,
            description: None,
        }
    }

    /// Whether this branch can still accept writes or be read from as a
    /// live target (as opposed to only appearing in another branch's
    /// history).
    pub fn is_active(&self) -> bool {
        self.status == BranchStatus::Active
    }
}
