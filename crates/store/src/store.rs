//! `GraphStore`: the storage trait and an in-memory implementation

use crate::edge::{Edge, EdgeLabel, EdgeStatus};
use crate::precedence::rank;
use crate::vertex::Vertex;
use branchgraph_core::{EntityId, GraphError, GraphResult, Timestamp};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage for vertices and their temporal edges.
///
/// Implementations only need to support append-only edge writes plus one
/// mutation (`close_edge`) that ends an edge's validity window — the engine
/// never deletes or rewrites an edge's `from`. This keeps every
/// implementation, in-memory or persistent, trivially able to answer "what
/// did this look like at time T" queries: nothing already written ever
/// changes shape, only gets a `to` appended.
pub trait GraphStore: Send + Sync {
    /// Insert or overwrite a vertex's static record (kind, literal payload).
    fn put_vertex(&self, vertex: Vertex);

    /// Fetch a vertex's static record by id, ignoring temporal visibility —
    /// callers are expected to have already established that some edge
    /// pointing at it is visible.
    fn get_vertex(&self, id: EntityId) -> Option<Vertex>;

    /// Append a new, currently-open edge.
    fn insert_edge(&self, edge: Edge) -> GraphResult<()>;

    /// Close the currently-open edge matching `(source, label, target,
    /// branch)`, setting its `to` to `at`. No-op-safe: returns
    /// `GraphError::NotFound` if no such open edge exists.
    fn close_edge(
        &self,
        source: EntityId,
        label: &EdgeLabel,
        target: EntityId,
        branch: EntityId,
        at: Timestamp,
    ) -> GraphResult<()>;

    /// All edges (any branch, any status, any validity window) with `source`.
    fn edges_from(&self, source: EntityId) -> Vec<Edge>;

    /// All edges (any branch, any status, any validity window) with `target`.
    fn edges_to(&self, target: EntityId) -> Vec<Edge>;

    /// Resolve the winning edge for each distinct precedence group among
    /// `source`'s edges that are visible under `in_lineage` at `query_time`.
    ///
    /// Single-valued slots (`HasValue`, `IsVisible`, `IsProtected`) group by label alone: a
    /// node has exactly one current value for a given attribute, so a
    /// parent-branch value and a child-branch value for the *same* slot
    /// must compete in the same precedence group even though they point at
    /// different (content-addressed) target vertices. Cardinality-many
    /// labels (`IsPartOf`, `HasAttribute`, `HasRelationship`, `HasPeer`)
    /// keep grouping by `(label, target)`, since multiple targets are
    /// expected to coexist there.
    ///
    /// `in_lineage` should answer whether an edge's `branch` appears in the
    /// querying branch's lineage chain; the store itself has no notion of
    /// branch parentage, so this is supplied by the caller (normally backed
    /// by `branchgraph_registry::Lineage::is_descendant`).
    fn resolve_from(
        &self,
        source: EntityId,
        query_time: Timestamp,
        in_lineage: &dyn Fn(EntityId) -> bool,
    ) -> Vec<Edge> {
        let candidates = self.edges_from(source);
        let mut groups: HashMap<PrecedenceKey, Vec<Edge>> = HashMap::new();
        for edge in candidates {
            if edge.is_visible_at(in_lineage(edge.branch), query_time) {
                groups
                    .entry(PrecedenceKey::for_edge(&edge))
                    .or_default()
                    .push(edge);
            }
        }
        groups
            .into_values()
            .filter_map(|group| rank(group.iter()).cloned())
            .filter(|winner| winner.status == EdgeStatus::Active)
            .collect()
    }
}

/// A hashable stand-in for `EdgeLabel`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EdgeLabelKey {
    IsPartOf,
    HasAttribute,
    HasValue,
    HasRelationship(String),
    HasPeer,
    IsVisible,
    IsProtected,
    HasSource,
    HasOwner,
}

impl From<&EdgeLabel> for EdgeLabelKey {
    fn from(label: &EdgeLabel) -> Self {
        match label {
            EdgeLabel::IsPartOf => EdgeLabelKey::IsPartOf,
            EdgeLabel::HasAttribute => EdgeLabelKey::HasAttribute,
            EdgeLabel::HasValue => EdgeLabelKey::HasValue,
            EdgeLabel::HasRelationship { identifier } => {
                EdgeLabelKey::HasRelationship(identifier.clone())
            }
            EdgeLabel::HasPeer => EdgeLabelKey::HasPeer,
            EdgeLabel::IsVisible => EdgeLabelKey::IsVisible,
            EdgeLabel::IsProtected => EdgeLabelKey::IsProtected,
            EdgeLabel::HasSource => EdgeLabelKey::HasSource,
            EdgeLabel::HasOwner => EdgeLabelKey::HasOwner,
        }
    }
}

/// The key edges are grouped by before precedence ranking picks one winner
/// per group. A slot that holds exactly one current value at a time
/// (`HasValue`, `IsVisible`, `IsProtected`, `HasSource`, `HasOwner`) must
/// group by label alone, ignoring `target`, since content-addressed
/// value/boolean vertices mean two competing writes to the same slot can
/// point at two different vertex ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PrecedenceKey {
    SingleValued(EdgeLabelKey),
    Targeted(EdgeLabelKey, EntityId),
}

impl PrecedenceKey {
    fn for_edge(edge: &Edge) -> Self {
        let label = EdgeLabelKey::from(&edge.label);
        match &edge.label {
            EdgeLabel::HasValue
            | EdgeLabel::IsVisible
            | EdgeLabel::IsProtected
            | EdgeLabel::HasSource
            | EdgeLabel::HasOwner => PrecedenceKey::SingleValued(label),
            _ => PrecedenceKey::Targeted(label, edge.target),
        }
    }
}

/// A simple, fully in-memory [`GraphStore`], suitable for tests and for
/// small deployments that don't need durability.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    vertices: DashMap<EntityId, Vertex>,
    /// Edges keyed by source, each behind its own lock so writers to
    /// different vertices don't contend.
    edges: DashMap<EntityId, RwLock<Vec<Edge>>>,
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        InMemoryStore {
            vertices: DashMap::new(),
            edges: DashMap::new(),
        }
    }
}

impl GraphStore for InMemoryStore {
    fn put_vertex(&self, vertex: Vertex) {
        self.vertices.insert(vertex.id, vertex);
    }

    fn get_vertex(&self, id: EntityId) -> Option<Vertex> {
        self.vertices.get(&id).map(|v| v.clone())
    }

    fn insert_edge(&self, edge: Edge) -> GraphResult<()> {
        self.edges
            .entry(edge.source)
            .or_default()
            .write()
            .push(edge);
        Ok(())
    }

    fn close_edge(
        &self,
        source: EntityId,
        label: &EdgeLabel,
        target: EntityId,
        branch: EntityId,
        at: Timestamp,
    ) -> GraphResult<()> {
        let bucket = self
            .edges
            .get(&source)
            .ok_or_else(|| GraphError::node_not_found(source.as_uuid(), branch.to_string()))?;
        let mut edges = bucket.write();
        let target_edge = edges.iter_mut().find(|e| {
            e.label == *label && e.target == target && e.branch == branch && e.to.is_none()
        });
        match target_edge {
            Some(e) => {
                e.to = Some(at);
                Ok(())
            }
            None => Err(GraphError::node_not_found(source.as_uuid(), branch.to_string())),
        }
    }

    fn edges_from(&self, source: EntityId) -> Vec<Edge> {
        self.edges
            .get(&source)
            .map(|b| b.read().clone())
            .unwrap_or_default()
    }

    fn edges_to(&self, target: EntityId) -> Vec<Edge> {
        self.edges
            .iter()
            .flat_map(|entry| entry.value().read().clone())
            .filter(|e| e.target == target)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::VertexKind;

    fn always_in_lineage(_: EntityId) -> bool {
        true
    }

    #[test]
    fn resolve_picks_latest_active_value() {
        let store = InMemoryStore::new();
        let attr = EntityId::new();
        let branch = EntityId::new();
        let v1 = EntityId::new();
        let v2 = EntityId::new();
        store.put_vertex(Vertex {
            id: v1,
            vertex_kind: VertexKind::AttributeValue,
            kind: None,
            name: None,
            value: None,
        });

        store
            .insert_edge(Edge::open(
                attr,
                EdgeLabel::HasValue,
                v1,
                branch,
                0,
                Timestamp::from_micros(0),
            ))
            .unwrap();
        store
            .close_edge(attr, &EdgeLabel::HasValue, v1, branch, Timestamp::from_micros(100))
            .unwrap();
        store
            .insert_edge(Edge::open(
                attr,
                EdgeLabel::HasValue,
                v2,
                branch,
                0,
                Timestamp::from_micros(100),
            ))
            .unwrap();

        let at_50 = store.resolve_from(attr, Timestamp::from_micros(50), &always_in_lineage);
        assert_eq!(at_50.len(), 1);
        assert_eq!(at_50[0].target, v1);

        let at_150 = store.resolve_from(attr, Timestamp::from_micros(150), &always_in_lineage);
        assert_eq!(at_150.len(), 1);
        assert_eq!(at_150[0].target, v2);
    }

    #[test]
    fn resolve_picks_higher_branch_level_value_across_differing_targets() {
        // A parent-branch value and a child-branch value for the same
        // attribute, pointing at two distinct (content-addressed) target
        // vertices, must still compete in one precedence group.
        let store = InMemoryStore::new();
        let attr = EntityId::new();
        let parent_branch = EntityId::new();
        let child_branch = EntityId::new();
        let v_parent = EntityId::new();
        let v_child = EntityId::new();

        store
            .insert_edge(Edge::open(
                attr,
                EdgeLabel::HasValue,
                v_parent,
                parent_branch,
                0,
                Timestamp::from_micros(0),
            ))
            .unwrap();
        store
            .insert_edge(Edge::open(
                attr,
                EdgeLabel::HasValue,
                v_child,
                child_branch,
                1,
                Timestamp::from_micros(10),
            ))
            .unwrap();

        let resolved = store.resolve_from(attr, Timestamp::from_micros(50), &always_in_lineage);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].target, v_child);
        assert_eq!(resolved[0].branch_level, 1);
    }

    #[test]
    fn tombstoned_edge_is_excluded() {
        let store = InMemoryStore::new();
        let node = EntityId::new();
        let attr = EntityId::new();
        let branch = EntityId::new();
        store
            .insert_edge(Edge::open(
                node,
                EdgeLabel::HasAttribute,
                attr,
                branch,
                0,
                Timestamp::from_micros(0),
            ))
            .unwrap();
        store
            .insert_edge(Edge {
                source: node,
                label: EdgeLabel::HasAttribute,
                target: attr,
                branch,
                branch_level: 0,
                status: EdgeStatus::Deleted,
                from: Timestamp::from_micros(50),
                to: None,
            })
            .unwrap();

        let resolved = store.resolve_from(node, Timestamp::from_micros(100), &always_in_lineage);
        assert!(resolved.is_empty());
    }

    #[test]
    fn out_of_lineage_edges_are_ignored() {
        let store = InMemoryStore::new();
        let node = EntityId::new();
        let attr = EntityId::new();
        let branch = EntityId::new();
        store
            .insert_edge(Edge::open(
                node,
                EdgeLabel::HasAttribute,
                attr,
                branch,
                0,
                Timestamp::from_micros(0),
            ))
            .unwrap();

        let resolved = store.resolve_from(node, Timestamp::from_micros(100), &|_| false);
        assert!(resolved.is_empty());
    }
}
