//! Resolving entities at `(branch, time)`: single lookups, batch lookups,
//! and filtered kind scans.
//!
//! Every read goes through the same three ingredients: the match (which
//! vertex, or which kind of vertex), the branch/time visibility predicate
//! ([`branchgraph_store::Edge::is_visible_at`] via
//! [`branchgraph_store::GraphStore::resolve_from`]), and precedence among
//! overlapping edges. This module never writes; it only composes reads over
//! the same store [`crate::node_manager::NodeManager`] writes through.

use branchgraph_core::{EntityId, GraphError, GraphResult, Timestamp, Value};
use branchgraph_registry::BranchRegistry;
use branchgraph_store::{EdgeLabel, GraphStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Upper bound on the number of entities a single [`QueryLayer::query`] call
/// returns when the caller doesn't supply a smaller `limit` — an unfiltered
/// scan of a large branch must not be usable to exhaust memory.
pub const DEFAULT_QUERY_LIMIT: usize = 1_000;

/// One entity resolved at a specific `(branch, time)`.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    /// The entity's id.
    pub id: EntityId,
    /// Its schema kind.
    pub kind: String,
    /// Attribute name -> currently visible value.
    pub attributes: HashMap<String, Value>,
    /// Relationship identifier -> currently visible peer ids.
    pub relationships: HashMap<String, Vec<EntityId>>,
    /// Attribute or relationship slot name -> its current `IsVisible` flag.
    pub is_visible: HashMap<String, bool>,
    /// Attribute or relationship slot name -> its current `IsProtected` flag.
    pub is_protected: HashMap<String, bool>,
    /// Attribute name -> the entity its value was sourced from. Only
    /// populated when the caller passed `include_source = true`.
    pub source: HashMap<String, EntityId>,
    /// Attribute name -> the entity that owns its value. Only populated
    /// when the caller passed `include_source = true`.
    pub owner: HashMap<String, EntityId>,
}

/// A filter over a resolved node's attributes/relationships, used by
/// [`QueryLayer::query`]. The wire API's dotted `attr__value` /
/// `attr__is_visible` / `rel__peer_attr__value` grammar desugars to one of
/// these per clause.
#[derive(Debug, Clone)]
pub enum NodeFilter {
    /// The named attribute must resolve to exactly this value.
    AttributeEquals(String, Value),
    /// The named attribute or relationship's `IsVisible` flag must match.
    IsVisible(String, bool),
    /// The named attribute or relationship's `IsProtected` flag must match.
    IsProtected(String, bool),
    /// At least one peer reachable through the named relationship must have
    /// the given value on `peer_attribute` — the `rel__peer_attr__value`
    /// path.
    RelationshipPath {
        /// The relationship's shared identifier.
        identifier: String,
        /// The attribute name to check on each peer.
        peer_attribute: String,
        /// The value the peer attribute must equal.
        value: Value,
    },
}

/// Composes parameterised reads over the graph store.
pub struct QueryLayer {
    store: Arc<dyn GraphStore>,
    registry: Arc<BranchRegistry>,
    root: EntityId,
}

impl QueryLayer {
    /// Wire a query layer over the given collaborators. `root` must match
    /// the graph's shared `Root` vertex, as with
    /// [`crate::diff::DiffEngine::new`].
    pub fn new(store: Arc<dyn GraphStore>, registry: Arc<BranchRegistry>, root: EntityId) -> Self {
        QueryLayer { store, registry, root }
    }

    fn in_lineage(&self, branch: EntityId) -> impl Fn(EntityId) -> bool {
        let lineage = self.registry.lineage();
        move |candidate| lineage.is_descendant(branch, candidate)
    }

    /// Resolve one entity's visible state at `(branch, at)`. `include_source`
    /// additionally resolves each attribute's `HasSource`/`HasOwner`
    /// provenance edges, an extra join skipped by default.
    pub fn get_one(
        &self,
        branch: EntityId,
        id: EntityId,
        at: Timestamp,
        include_source: bool,
    ) -> GraphResult<ResolvedNode> {
        self.registry.get(branch)?;
        let predicate = self.in_lineage(branch);
        let membership = self
            .store
            .resolve_from(self.root, at, &predicate)
            .into_iter()
            .find(|e| e.label == EdgeLabel::IsPartOf && e.target == id)
            .ok_or_else(|| GraphError::node_not_found(id.as_uuid(), branch.to_string()))?;
        self.resolve_node(membership.target, branch, at, include_source)
    }

    /// Resolve a batch of entities, silently omitting ids that don't
    /// resolve (a missing peer in a batch read is not itself an error —
    /// [`QueryLayer::get_one`] is the right call when absence matters).
    pub fn get_many(
        &self,
        branch: EntityId,
        ids: &[EntityId],
        at: Timestamp,
        include_source: bool,
    ) -> GraphResult<Vec<ResolvedNode>> {
        self.registry.get(branch)?;
        Ok(ids
            .iter()
            .filter_map(|id| self.get_one(branch, *id, at, include_source).ok())
            .collect())
    }

    /// All entities of `kind` visible on `branch` at `at` whose attributes
    /// and relationships satisfy every filter, capped at `limit` (or
    /// [`DEFAULT_QUERY_LIMIT`] if `None`). A truncated result is logged, not
    /// silently returned as if it were complete.
    pub fn query(
        &self,
        branch: EntityId,
        kind: &str,
        filters: &[NodeFilter],
        limit: Option<usize>,
        at: Timestamp,
    ) -> GraphResult<Vec<ResolvedNode>> {
        self.registry.get(branch)?;
        let cap = limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let predicate = self.in_lineage(branch);
        let mut matches = Vec::new();
        let mut truncated = false;
        for membership in self.store.resolve_from(self.root, at, &predicate) {
            if membership.label != EdgeLabel::IsPartOf {
                continue;
            }
            let Some(vertex) = self.store.get_vertex(membership.target) else {
                continue;
            };
            if vertex.kind.as_deref() != Some(kind) {
                continue;
            }
            let resolved = self.resolve_node(membership.target, branch, at, false)?;
            if filters.iter().all(|f| self.matches_filter(branch, at, &resolved, f)) {
                if matches.len() >= cap {
                    truncated = true;
                    break;
                }
                matches.push(resolved);
            }
        }
        matches.sort_by_key(|n| n.id);
        if truncated {
            warn!(%branch, kind, cap, "query result truncated at limit");
        }
        Ok(matches)
    }

    fn resolve_node(
        &self,
        node: EntityId,
        branch: EntityId,
        at: Timestamp,
        include_source: bool,
    ) -> GraphResult<ResolvedNode> {
        let predicate = self.in_lineage(branch);
        let kind = self
            .store
            .get_vertex(node)
            .and_then(|v| v.kind)
            .unwrap_or_default();

        let mut attributes = HashMap::new();
        let mut relationships: HashMap<String, Vec<EntityId>> = HashMap::new();
        let mut is_visible = HashMap::new();
        let mut is_protected = HashMap::new();
        let mut source = HashMap::new();
        let mut owner = HashMap::new();

        for edge in self.store.resolve_from(node, at, &predicate) {
            match &edge.label {
                EdgeLabel::HasAttribute => {
                    let Some(attr_vertex) = self.store.get_vertex(edge.target) else {
                        continue;
                    };
                    let Some(name) = attr_vertex.name else { continue };
                    let slot = self.store.resolve_from(edge.target, at, &predicate);
                    let value = slot
                        .iter()
                        .find(|e| e.label == EdgeLabel::HasValue)
                        .and_then(|e| self.store.get_vertex(e.target))
                        .and_then(|v| v.value);
                    if let Some(value) = value {
                        attributes.insert(name.clone(), value);
                    }
                    if let Some(visible) = bool_flag(&self.store, &slot, &EdgeLabel::IsVisible) {
                        is_visible.insert(name.clone(), visible);
                    }
                    if let Some(protected) = bool_flag(&self.store, &slot, &EdgeLabel::IsProtected) {
                        is_protected.insert(name.clone(), protected);
                    }
                    if include_source {
                        if let Some(source_id) =
                            slot.iter().find(|e| e.label == EdgeLabel::HasSource).map(|e| e.target)
                        {
                            source.insert(name.clone(), source_id);
                        }
                        if let Some(owner_id) =
                            slot.iter().find(|e| e.label == EdgeLabel::HasOwner).map(|e| e.target)
                        {
                            owner.insert(name, owner_id);
                        }
                    }
                }
                EdgeLabel::HasRelationship { identifier } => {
                    let slot = self.store.resolve_from(edge.target, at, &predicate);
                    let peers: Vec<EntityId> = slot
                        .iter()
                        .filter(|e| e.label == EdgeLabel::HasPeer)
                        .map(|e| e.target)
                        .collect();
                    relationships.entry(identifier.clone()).or_default().extend(peers);
                    if let Some(visible) = bool_flag(&self.store, &slot, &EdgeLabel::IsVisible) {
                        is_visible.insert(identifier.clone(), visible);
                    }
                    if let Some(protected) = bool_flag(&self.store, &slot, &EdgeLabel::IsProtected) {
                        is_protected.insert(identifier.clone(), protected);
                    }
                }
                _ => {}
            }
        }

        Ok(ResolvedNode {
            id: node,
            kind,
            attributes,
            relationships,
            is_visible,
            is_protected,
            source,
            owner,
        })
    }

    /// Resolve a peer's visible attribute value at `(branch, at)`, for the
    /// `rel__peer_attr__value` filter path.
    fn peer_attribute(&self, branch: EntityId, peer: EntityId, attribute: &str, at: Timestamp) -> Option<Value> {
        self.resolve_node(peer, branch, at, false)
            .ok()
            .and_then(|resolved| resolved.attributes.get(attribute).cloned())
    }

    fn matches_filter(&self, branch: EntityId, at: Timestamp, node: &ResolvedNode, filter: &NodeFilter) -> bool {
        match filter {
            NodeFilter::AttributeEquals(name, expected) => node.attributes.get(name) == Some(expected),
            NodeFilter::IsVisible(name, expected) => node.is_visible.get(name) == Some(expected),
            NodeFilter::IsProtected(name, expected) => node.is_protected.get(name) == Some(expected),
            NodeFilter::RelationshipPath {
                identifier,
                peer_attribute,
                value,
            } => node
                .relationships
                .get(identifier)
                .map(|peers| {
                    peers
                        .iter()
                        .any(|peer| self.peer_attribute(branch, *peer, peer_attribute, at).as_ref() == Some(value))
                })
                .unwrap_or(false),
        }
    }
}

fn bool_flag(store: &Arc<dyn GraphStore>, slot: &[branchgraph_store::Edge], label: &EdgeLabel) -> Option<bool> {
    slot.iter()
        .find(|e| &e.label == label)
        .and_then(|e| store.get_vertex(e.target))
        .and_then(|v| v.value)
        .and_then(|v| match v {
            Value::Bool(b) => Some(b),
            _ => None,
        })
}
