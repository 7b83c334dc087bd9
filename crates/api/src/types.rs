//! Request/response types for the facade
//!
//! Every type here derives `serde::Serialize`/`Deserialize` so a transport
//! adapter (GraphQL, REST, a test harness) can hang a wire format off it
//! without the facade itself depending on one.

use branchgraph_core::{Timestamp, Value};
use branchgraph_engine::{DiffAction, NodeDiff, ResolvedNode};
use branchgraph_registry::{BranchRecord, BranchStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Fields needed to fork a new branch (`BranchCreate`).
#[derive(Debug, Clone, Deserialize)]
pub struct NewBranch {
    /// Candidate branch name, checked against the `^[A-Za-z0-9][A-Za-z0-9_\-./]{0,63}$` grammar.
    pub name: String,
    /// Branch to fork from, by id. Forks from the default branch if omitted.
    pub parent: Option<Uuid>,
    /// Optional free-form description.
    pub description: Option<String>,
}

/// A branch as seen by a caller: everything in [`BranchRecord`], with the
/// internal id types rendered as plain `Uuid`s and `is_default` derived
/// rather than stored.
#[derive(Debug, Clone, Serialize)]
pub struct BranchSummary {
    /// The branch's stable id.
    pub id: Uuid,
    /// The branch's human-chosen name.
    pub name: String,
    /// The parent branch's id, or `None` for the default branch.
    pub parent: Option<Uuid>,
    /// Distance from the default branch along the parent chain.
    pub branch_level: u32,
    /// When the branch was created.
    pub created_at: Timestamp,
    /// The fork point the branch's diffs and merges are measured from.
    pub branched_from: Timestamp,
    /// Whether the branch is still open for reads and writes.
    pub is_active: bool,
    /// Whether this is the default (root, parentless) branch.
    pub is_default: bool,
    /// Free-form description, settable via `BranchUpdate`.
    pub description: Option<String>,
}

impl From<BranchRecord> for BranchSummary {
    fn from(record: BranchRecord) -> Self {
        BranchSummary {
            id: record.id.as_uuid(),
            name: record.name.as_str().to_string(),
            parent: record.parent.map(|p| p.as_uuid()),
            branch_level: record.branch_level,
            created_at: record.created_at,
            branched_from: record.branched_from,
            is_active: record.status == BranchStatus::Active,
            is_default: record.parent.is_none(),
            description: record.description,
        }
    }
}

/// Fields settable via `BranchUpdate`. Only `description` is mutable today;
/// renaming or re-parenting go through dedicated operations
/// (`BranchRebase`) rather than this catch-all.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BranchUpdate {
    /// New description, or `None` to clear it.
    pub description: Option<String>,
}

/// Attributes, relationships, and provenance to set when creating a node
/// (`NodeCreate`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewNode {
    /// The node's schema kind.
    pub kind: String,
    /// Attribute name -> literal value.
    pub attributes: HashMap<String, Value>,
    /// Relationship identifier -> peer node ids.
    pub relationships: HashMap<String, Vec<Uuid>>,
    /// Attribute name -> the entity its value was sourced from. Attributes
    /// omitted here get no `HasSource` edge.
    #[serde(default)]
    pub attribute_sources: HashMap<String, Uuid>,
    /// Attribute name -> the entity that owns its value. Attributes omitted
    /// here get no `HasOwner` edge.
    #[serde(default)]
    pub attribute_owners: HashMap<String, Uuid>,
}

/// A node resolved at a specific `(branch, time)`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    /// The node's id.
    pub id: Uuid,
    /// Its schema kind.
    pub kind: String,
    /// Attribute name -> currently visible value.
    pub attributes: HashMap<String, Value>,
    /// Relationship identifier -> currently visible peer ids.
    pub relationships: HashMap<String, Vec<Uuid>>,
    /// Attribute or relationship slot name -> its current `IsVisible` flag.
    pub is_visible: HashMap<String, bool>,
    /// Attribute or relationship slot name -> its current `IsProtected` flag.
    pub is_protected: HashMap<String, bool>,
    /// Attribute name -> the entity its value was sourced from. Empty unless
    /// the request asked for `include_source`.
    pub source: HashMap<String, Uuid>,
    /// Attribute name -> the entity that owns its value. Empty unless the
    /// request asked for `include_source`.
    pub owner: HashMap<String, Uuid>,
}

impl From<ResolvedNode> for NodeSummary {
    fn from(node: ResolvedNode) -> Self {
        NodeSummary {
            id: node.id.as_uuid(),
            kind: node.kind,
            attributes: node.attributes,
            relationships: node
                .relationships
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().map(|id| id.as_uuid()).collect()))
                .collect(),
            is_visible: node.is_visible,
            is_protected: node.is_protected,
            source: node.source.into_iter().map(|(k, v)| (k, v.as_uuid())).collect(),
            owner: node.owner.into_iter().map(|(k, v)| (k, v.as_uuid())).collect(),
        }
    }
}

/// A single filter term for `NodeQuery`: a dotted `attr__value` /
/// `attr__is_visible` / `rel__peer_attr__value` field name, desugared
/// against the kind's schema by [`crate::facade`].
#[derive(Debug, Clone, Deserialize)]
pub struct NodeFilterRequest {
    /// Dotted slot-and-property field name, e.g. `hostname__value` or
    /// `device__interfaces__hostname__value`.
    pub field: String,
    /// The value the field must resolve to.
    pub value: Value,
}

/// Parameters for a filtered kind scan (`NodeQuery`).
#[derive(Debug, Clone, Deserialize)]
pub struct NodeQuery {
    /// The schema kind to scan.
    pub kind: String,
    /// Equality filters, ANDed together.
    #[serde(default)]
    pub filters: Vec<NodeFilterRequest>,
    /// Maximum number of results (capped at the query layer's default if omitted).
    pub limit: Option<usize>,
}

/// Whether a diffed item was added, changed, or removed. Mirrors
/// [`DiffAction`] with the wire-facing uppercase vocabulary named in the
/// REST shape (`ADDED|UPDATED|REMOVED`).
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffActionWire {
    /// Present on the branch, absent on the parent view.
    Added,
    /// Present on both, but the value/peer set differs.
    Updated,
    /// Present on the parent view, tombstoned on the branch.
    Removed,
}

impl From<DiffAction> for DiffActionWire {
    fn from(action: DiffAction) -> Self {
        match action {
            DiffAction::Added => DiffActionWire::Added,
            DiffAction::Updated => DiffActionWire::Updated,
            DiffAction::Removed => DiffActionWire::Removed,
        }
    }
}

/// One attribute's change, wire-rendered.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeDiffSummary {
    /// Attribute name.
    pub name: String,
    /// Added / Updated / Removed.
    pub action: DiffActionWire,
    /// The value inherited from the parent's view, if any.
    pub previous: Option<Value>,
    /// The value written on this branch, if the attribute isn't removed.
    pub new: Option<Value>,
}

/// One relationship's change, wire-rendered.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipDiffSummary {
    /// The relationship's shared identifier.
    pub identifier: String,
    /// Added / Updated / Removed.
    pub action: DiffActionWire,
    /// Peers visible on the parent's view.
    pub previous_peers: Vec<Uuid>,
    /// Peers visible after this branch's writes.
    pub new_peers: Vec<Uuid>,
}

/// One node's change, wire-rendered, matching the REST `NodeDiff` shape.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDiffSummary {
    /// The node's id.
    pub node: Uuid,
    /// The node's schema kind, if resolvable.
    pub kind: Option<String>,
    /// Added / Updated / Removed.
    pub action: DiffActionWire,
    /// Attribute-level changes.
    pub attributes: Vec<AttributeDiffSummary>,
    /// Relationship-level changes.
    pub relationships: Vec<RelationshipDiffSummary>,
}

impl From<NodeDiff> for NodeDiffSummary {
    fn from(diff: NodeDiff) -> Self {
        NodeDiffSummary {
            node: diff.node.as_uuid(),
            kind: diff.kind,
            action: diff.action.into(),
            attributes: diff
                .attributes
                .into_iter()
                .map(|a| AttributeDiffSummary {
                    name: a.name,
                    action: a.action.into(),
                    previous: a.before,
                    new: a.after,
                })
                .collect(),
            relationships: diff
                .relationships
                .into_iter()
                .map(|r| RelationshipDiffSummary {
                    identifier: r.identifier,
                    action: r.action.into(),
                    previous_peers: r.before_peers.into_iter().map(|id| id.as_uuid()).collect(),
                    new_peers: r.after_peers.into_iter().map(|id| id.as_uuid()).collect(),
                })
                .collect(),
        }
    }
}

/// The result of `DiffSummary`: `{ <branch-name>: [NodeDiff, ...] }`, the
/// grouping the REST `GET /diff/data` response uses.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DiffSummary {
    /// Branch name -> that branch's node diffs against its parent.
    #[serde(flatten)]
    pub by_branch: HashMap<String, Vec<NodeDiffSummary>>,
}
