//! Temporal edges

use branchgraph_core::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};

/// What relation an edge encodes between its source and target vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLabel {
    /// `Root -> Node` or `Node -> Attribute`/`Node -> Relationship`:
    /// membership in the branch's live graph. A `deleted`-status edge of
    /// this label is the tombstone left by deleting the source.
    IsPartOf,
    /// `Node -> Attribute`: the node carries this attribute slot.
    HasAttribute,
    /// `Attribute -> AttributeValue`: the slot's current (or historical,
    /// once closed) literal value.
    HasValue,
    /// `Node -> Relationship`: the node has an instance of this
    /// relationship slot.
    HasRelationship {
        /// The relationship's shared identifier, e.g. `device__interfaces`.
        identifier: String,
    },
    /// `Relationship -> Node`: the peer a relationship instance points at.
    HasPeer,
    /// `Attribute` or `Relationship` -> `Boolean`: whether the slot is
    /// currently visible to readers. Distinct from `IsProtected` — neither
    /// is an instance of a generic named-flag label.
    IsVisible,
    /// `Attribute` or `Relationship` -> `Boolean`: whether the slot is
    /// protected from further writes.
    IsProtected,
    /// `Attribute` or `Relationship` -> `Node`: the entity this slot's
    /// value was sourced from. Read as a provenance reference, never
    /// coerced to a boolean.
    HasSource,
    /// `Attribute` or `Relationship` -> `Node`: the entity that owns this
    /// slot's value.
    HasOwner,
}

/// Lifecycle status carried by an edge's temporal header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStatus {
    /// The edge represents a currently-held relation.
    Active,
    /// The edge represents a relation that has been removed; retained as a
    /// tombstone so branch-scoped diffs can detect the removal.
    Deleted,
}

/// A directed, temporally-scoped edge between two vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source vertex.
    pub source: EntityId,
    /// What this edge means.
    pub label: EdgeLabel,
    /// Target vertex.
    pub target: EntityId,
    /// The branch this edge was written on.
    pub branch: EntityId,
    /// `branch`'s `branch_level` at the moment this edge was written.
    ///
    /// Snapshotted rather than looked up live, so a later rebase of
    /// `branch` doesn't retroactively change how already-written edges
    /// rank against each other.
    pub branch_level: u32,
    /// Whether this edge is a live relation or a tombstone.
    pub status: EdgeStatus,
    /// Start of the validity interval, inclusive.
    pub from: Timestamp,
    /// End of the validity interval, exclusive. `None` means still open.
    pub to: Option<Timestamp>,
}

impl Edge {
    /// Build a new, currently-open edge.
    pub fn open(
        source: EntityId,
        label: EdgeLabel,
        target: EntityId,
        branch: EntityId,
        branch_level: u32,
        from: Timestamp,
    ) -> Self {
        Edge {
            source,
            label,
            target,
            branch,
            branch_level,
            status: EdgeStatus::Active,
            from,
            to: None,
        }
    }

    /// Whether this edge is visible to a query issued against
    /// `(query_lineage, query_time)`.
    ///
    /// `in_lineage` should be true iff `self.branch` appears in the
    /// querying branch's lineage chain; the caller resolves that (a
    /// `store::GraphStore` implementation delegates to the registry).
    pub fn is_visible_at(&self, in_lineage: bool, query_time: Timestamp) -> bool {
        in_lineage
            && self.from <= query_time
            && self.to.map(|to| to > query_time).unwrap_or(true)
    }

    /// Close this edge's validity interval at `at`, returning the closed
    /// copy. The original is left untouched — the store is expected to
    /// replace the stored edge with the result and insert a fresh one for
    /// whatever superseded it.
    pub fn close(&self, at: Timestamp) -> Edge {
        let mut closed = self.clone();
        closed.to = Some(at);
        closed
    }

    /// Mark this edge deleted at `at`: closes its validity window and flips
    /// its status, producing the tombstone edge to insert.
    pub fn tombstone(&self, at: Timestamp, branch: EntityId, branch_level: u32) -> Edge {
        Edge {
            source: self.source,
            label: self.label.clone(),
            target: self.target,
            branch,
            branch_level,
            status: EdgeStatus::Deleted,
            from: at,
            to: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_edge_visible_after_from_and_forever_after() {
        let branch = EntityId::new();
        let edge = Edge::open(
            EntityId::new(),
            EdgeLabel::IsPartOf,
            EntityId::new(),
            branch,
            0,
            Timestamp::from_micros(100),
        );
        assert!(!edge.is_visible_at(true, Timestamp::from_micros(50)));
        assert!(edge.is_visible_at(true, Timestamp::from_micros(100)));
        assert!(edge.is_visible_at(true, Timestamp::from_micros(1_000_000)));
    }

    #[test]
    fn closed_edge_invisible_at_or_after_to() {
        let branch = EntityId::new();
        let edge = Edge::open(
            EntityId::new(),
            EdgeLabel::HasValue,
            EntityId::new(),
            branch,
            0,
            Timestamp::from_micros(100),
        )
        .close(Timestamp::from_micros(200));
        assert!(edge.is_visible_at(true, Timestamp::from_micros(150)));
        assert!(!edge.is_visible_at(true, Timestamp::from_micros(200)));
    }

    #[test]
    fn out_of_lineage_never_visible() {
        let branch = EntityId::new();
        let edge = Edge::open(
            EntityId::new(),
            EdgeLabel::IsPartOf,
            EntityId::new(),
            branch,
            0,
            Timestamp::from_micros(0),
        );
        assert!(!edge.is_visible_at(false, Timestamp::from_micros(1_000)));
    }
}
