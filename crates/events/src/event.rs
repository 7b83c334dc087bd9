//! Event payloads

use branchgraph_core::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum EventKind {
    /// A node was created.
    NodeCreated,
    /// A node's attribute or relationship was updated.
    NodeUpdated,
    /// A node was deleted.
    NodeDeleted,
    /// A branch was created.
    BranchCreated,
    /// A branch was rebased onto a new parent.
    BranchRebased,
    /// A branch was deleted.
    BranchDeleted,
    /// A branch was merged into its parent.
    BranchMerged {
        /// Number of conflicts resolved during the merge.
        conflicts_resolved: usize,
    },
}

/// A single emitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The entity the event concerns (a node id or a branch id).
    pub entity: EntityId,
    /// The branch the mutation happened on.
    pub branch: EntityId,
    /// When the mutation took effect.
    pub at: Timestamp,
}

impl Event {
    /// Build an event.
    pub fn new(kind: EventKind, entity: EntityId, branch: EntityId, at: Timestamp) -> Self {
        Event {
            kind,
            entity,
            branch,
            at,
        }
    }
}
