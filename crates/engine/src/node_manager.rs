//! Node creation, attribute/relationship updates, and deletion
//!
//! There is exactly one `Root` vertex for the whole graph, shared by every
//! branch — branches differ only in which edges out of it are visible, via
//! each edge's temporal header, never in which vertex they hang off of. A
//! per-branch root would hide a parent branch's nodes from a child branch
//! the moment you tried to look them up by source vertex, since an edge's
//! source never changes after it's written.
//!
//! Updates never overwrite a `HasValue` edge in place: the old edge is
//! closed at the write's timestamp and a fresh `AttributeValue` vertex and
//! edge are opened. This is what makes point-in-time queries work — the
//! prior value is still reachable at any time before the close.

use branchgraph_concurrency::BranchLocks;
use branchgraph_core::{
    ConstraintReason, EntityId, ErrorDetails, GraphError, GraphResult, Timestamp, Value,
};
use branchgraph_events::{Event, EventEmitter, EventKind};
use branchgraph_registry::BranchRegistry;
use branchgraph_schema::{Cardinality, KindSchema, SchemaCache};
use branchgraph_store::{Edge, EdgeLabel, GraphStore, Vertex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// The attributes and relationships to set when creating a node.
#[derive(Debug, Clone, Default)]
pub struct NewNode {
    /// Attribute name -> literal value.
    pub attributes: HashMap<String, Value>,
    /// Relationship identifier -> the peer node ids to link.
    pub relationships: HashMap<String, Vec<EntityId>>,
    /// Attribute name -> the entity its value was sourced from, for
    /// attributes that carry provenance (`HAS_SOURCE`). Omitted attributes
    /// get no `HasSource` edge.
    pub attribute_sources: HashMap<String, EntityId>,
    /// Attribute name -> the entity that owns its value (`HAS_OWNER`).
    /// Omitted attributes get no `HasOwner` edge.
    pub attribute_owners: HashMap<String, EntityId>,
}

/// Creates, updates, and deletes nodes, enforcing the schema in effect on
/// the target branch.
pub struct NodeManager {
    store: Arc<dyn GraphStore>,
    registry: Arc<BranchRegistry>,
    schema: Arc<SchemaCache>,
    events: Arc<EventEmitter>,
    locks: Arc<BranchLocks>,
    root: EntityId,
}

impl NodeManager {
    /// Wire a node manager over the given collaborators, creating the
    /// graph's single `Root` vertex.
    pub fn new(
        store: Arc<dyn GraphStore>,
        registry: Arc<BranchRegistry>,
        schema: Arc<SchemaCache>,
        events: Arc<EventEmitter>,
        locks: Arc<BranchLocks>,
    ) -> Self {
        let root = EntityId::new();
        store.put_vertex(Vertex::root(root));
        NodeManager {
            store,
            registry,
            schema,
            events,
            locks,
            root,
        }
    }

    /// The id of the graph's shared `Root` vertex.
    pub fn root_vertex(&self) -> EntityId {
        self.root
    }

    /// Resolve the schema for `kind` visible on `branch`, walking the
    /// branch's lineage toward the root until a registered schema is found.
    fn resolve_schema(&self, branch: EntityId, kind: &str) -> GraphResult<Arc<KindSchema>> {
        if let Some(schema) = self.schema.get(branch, kind) {
            return Ok(schema);
        }
        let lineage = self.registry.lineage();
        for ancestor in lineage.chain(branch) {
            if let Some(schema) = self.schema.get(ancestor, kind) {
                return Ok(self.schema.register(branch, (*schema).clone()));
            }
        }
        Err(GraphError::NotFound {
            kind: "schema",
            id: kind.to_string(),
            branch: branch.to_string(),
        })
    }

    fn validate(&self, schema: &KindSchema, new: &NewNode) -> GraphResult<()> {
        for attr in &schema.attributes {
            let provided = new.attributes.get(&attr.name);
            match provided {
                None if !attr.optional => {
                    return Err(GraphError::Validation(ErrorDetails::new(
                        format!("attributes.{}", attr.name),
                        ConstraintReason::Required,
                    )));
                }
                Some(value) if value.kind() != attr.value_kind => {
                    return Err(GraphError::Validation(ErrorDetails::new(
                        format!("attributes.{}", attr.name),
                        ConstraintReason::TypeMismatch {
                            expected: kind_name(attr.value_kind),
                            actual: kind_name(value.kind()),
                        },
                    )));
                }
                Some(value) => {
                    if let Some(choices) = &attr.choices {
                        if !choices.contains(value) {
                            return Err(GraphError::Validation(ErrorDetails::new(
                                format!("attributes.{}", attr.name),
                                ConstraintReason::NotInChoices {
                                    value: value.to_string(),
                                },
                            )));
                        }
                    }
                }
                None => {}
            }
        }
        for rel in &schema.relationships {
            let peers = new.relationships.get(&rel.identifier);
            match peers {
                None if !rel.optional => {
                    return Err(GraphError::Validation(ErrorDetails::new(
                        format!("relationships.{}", rel.identifier),
                        ConstraintReason::Required,
                    )));
                }
                Some(peers) if rel.cardinality == Cardinality::One && peers.len() > 1 => {
                    return Err(GraphError::Validation(ErrorDetails::new(
                        format!("relationships.{}", rel.identifier),
                        ConstraintReason::CardinalityViolation { expected: "one" },
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Create a node of `kind` on `branch`, writing its membership,
    /// attribute, and relationship edges. Every attribute and relationship
    /// instance also gets a default `IsVisible(true)`/`IsProtected(false)`
    /// pair, per the write algorithm; an attribute with a declared source
    /// or owner additionally gets a `HasSource`/`HasOwner` edge.
    #[instrument(skip(self, new))]
    pub async fn create_node(
        &self,
        branch: EntityId,
        kind: &str,
        new: NewNode,
        at: Timestamp,
    ) -> GraphResult<EntityId> {
        let _guard = self.locks.acquire(branch).await;
        let branch_record = self.registry.get(branch)?;
        if !branch_record.is_active() {
            return Err(GraphError::Validation(ErrorDetails::new(
                "branch",
                ConstraintReason::Other("branch is deleted".to_string()),
            )));
        }
        let level = branch_record.branch_level;
        let schema = self.resolve_schema(branch, kind)?;
        self.validate(&schema, &new)?;

        let node_id = EntityId::new();
        self.store.put_vertex(Vertex::node(node_id, kind));
        self.store.insert_edge(Edge::open(
            self.root,
            EdgeLabel::IsPartOf,
            node_id,
            branch,
            level,
            at,
        ))?;

        for (name, value) in &new.attributes {
            let attr_id = EntityId::new();
            self.store.put_vertex(Vertex::attribute(attr_id, name.clone()));
            self.store.insert_edge(Edge::open(
                node_id,
                EdgeLabel::HasAttribute,
                attr_id,
                branch,
                level,
                at,
            ))?;
            let value_id = EntityId::new();
            self.store
                .put_vertex(Vertex::attribute_value(value_id, value.clone()));
            self.store.insert_edge(Edge::open(
                attr_id,
                EdgeLabel::HasValue,
                value_id,
                branch,
                level,
                at,
            ))?;
            self.emit_default_flags(attr_id, branch, level, at)?;
            if let Some(source) = new.attribute_sources.get(name) {
                self.store
                    .insert_edge(Edge::open(attr_id, EdgeLabel::HasSource, *source, branch, level, at))?;
            }
            if let Some(owner) = new.attribute_owners.get(name) {
                self.store
                    .insert_edge(Edge::open(attr_id, EdgeLabel::HasOwner, *owner, branch, level, at))?;
            }
        }

        let predicate = self.in_lineage(branch);
        for (identifier, peers) in &new.relationships {
            for peer in peers {
                self.store
                    .resolve_from(self.root, at, &predicate)
                    .into_iter()
                    .find(|e| e.label == EdgeLabel::IsPartOf && e.target == *peer)
                    .ok_or_else(|| GraphError::node_not_found(peer.as_uuid(), branch.to_string()))?;

                let rel_id = EntityId::new();
                self.store
                    .put_vertex(Vertex::relationship(rel_id, identifier.clone()));
                self.store.insert_edge(Edge::open(
                    node_id,
                    EdgeLabel::HasRelationship {
                        identifier: identifier.clone(),
                    },
                    rel_id,
                    branch,
                    level,
                    at,
                ))?;
                self.store
                    .insert_edge(Edge::open(rel_id, EdgeLabel::HasPeer, *peer, branch, level, at))?;
                self.emit_default_flags(rel_id, branch, level, at)?;
            }
        }

        self.events.emit(Event::new(
            EventKind::NodeCreated,
            node_id,
            branch,
            at,
        ));
        Ok(node_id)
    }

    /// Emit the default `IsVisible(true)`/`IsProtected(false)` edges every
    /// attribute or relationship instance gets at creation.
    fn emit_default_flags(&self, slot: EntityId, branch: EntityId, level: u32, at: Timestamp) -> GraphResult<()> {
        let visible_id = EntityId::new();
        self.store.put_vertex(Vertex::boolean(visible_id, true));
        self.store
            .insert_edge(Edge::open(slot, EdgeLabel::IsVisible, visible_id, branch, level, at))?;

        let protected_id = EntityId::new();
        self.store.put_vertex(Vertex::boolean(protected_id, false));
        self.store
            .insert_edge(Edge::open(slot, EdgeLabel::IsProtected, protected_id, branch, level, at))?;
        Ok(())
    }

    fn in_lineage(&self, branch: EntityId) -> impl Fn(EntityId) -> bool {
        let lineage = self.registry.lineage();
        move |candidate| lineage.is_descendant(branch, candidate)
    }

    fn find_attribute(
        &self,
        branch: EntityId,
        node: EntityId,
        name: &str,
        at: Timestamp,
    ) -> GraphResult<EntityId> {
        let predicate = self.in_lineage(branch);
        let winners = self.store.resolve_from(node, at, &predicate);
        for edge in winners {
            if edge.label == EdgeLabel::HasAttribute {
                if let Some(vertex) = self.store.get_vertex(edge.target) {
                    if vertex.name.as_deref() == Some(name) {
                        return Ok(edge.target);
                    }
                }
            }
        }
        Err(GraphError::NotFound {
            kind: "attribute",
            id: name.to_string(),
            branch: branch.to_string(),
        })
    }

    /// Update an attribute's value, closing the prior `HasValue` edge and
    /// opening a fresh one rather than mutating it in place.
    #[instrument(skip(self, value))]
    pub async fn update_attribute(
        &self,
        branch: EntityId,
        node: EntityId,
        attribute_name: &str,
        value: Value,
        at: Timestamp,
    ) -> GraphResult<()> {
        let _guard = self.locks.acquire(branch).await;
        let branch_record = self.registry.get(branch)?;
        let level = branch_record.branch_level;

        let node_kind = self
            .store
            .get_vertex(node)
            .and_then(|v| v.kind)
            .ok_or_else(|| GraphError::node_not_found(node.as_uuid(), branch.to_string()))?;
        let schema = self.resolve_schema(branch, &node_kind)?;
        if let Some(descriptor) = schema.attribute(attribute_name) {
            if value.kind() != descriptor.value_kind {
                return Err(GraphError::Validation(ErrorDetails::new(
                    format!("attributes.{attribute_name}"),
                    ConstraintReason::TypeMismatch {
                        expected: kind_name(descriptor.value_kind),
                        actual: kind_name(value.kind()),
                    },
                )));
            }
            if let Some(choices) = &descriptor.choices {
                if !choices.contains(&value) {
                    return Err(GraphError::Validation(ErrorDetails::new(
                        format!("attributes.{attribute_name}"),
                        ConstraintReason::NotInChoices {
                            value: value.to_string(),
                        },
                    )));
                }
            }
        }

        let attr_id = self.find_attribute(branch, node, attribute_name, at)?;
        let predicate = self.in_lineage(branch);
        let current = self
            .store
            .resolve_from(attr_id, at, &predicate)
            .into_iter()
            .find(|e| e.label == EdgeLabel::HasValue);

        // Only close the edge in place if it was written on this very
        // branch: closing an ancestor's edge would corrupt the ancestor's
        // own history. A cross-branch update instead leaves the ancestor's
        // edge open and relies on this branch's higher `branch_level` to
        // win at read time.
        if let Some(current) = &current {
            if current.branch == branch {
                self.store.close_edge(
                    attr_id,
                    &EdgeLabel::HasValue,
                    current.target,
                    current.branch,
                    at,
                )?;
            }
        }

        let value_id = EntityId::new();
        self.store.put_vertex(Vertex::attribute_value(value_id, value));
        self.store
            .insert_edge(Edge::open(attr_id, EdgeLabel::HasValue, value_id, branch, level, at))?;

        self.events
            .emit(Event::new(EventKind::NodeUpdated, node, branch, at));
        Ok(())
    }

    /// Replace a cardinality-one relationship's peer, tombstoning the old
    /// `HasRelationship`/`HasPeer` pair and opening a fresh one rather than
    /// repointing the existing `HasPeer` edge in place.
    ///
    /// Applies the same same-branch-only close discipline as
    /// [`Self::update_attribute`]: a pair inherited from an ancestor branch
    /// is left untouched and superseded purely by this branch's tombstone
    /// plus its higher `branch_level`.
    #[instrument(skip(self))]
    pub async fn replace_relationship(
        &self,
        branch: EntityId,
        node: EntityId,
        identifier: &str,
        peer: EntityId,
        at: Timestamp,
    ) -> GraphResult<()> {
        let _guard = self.locks.acquire(branch).await;
        let branch_record = self.registry.get(branch)?;
        let level = branch_record.branch_level;

        let node_kind = self
            .store
            .get_vertex(node)
            .and_then(|v| v.kind)
            .ok_or_else(|| GraphError::node_not_found(node.as_uuid(), branch.to_string()))?;
        let schema = self.resolve_schema(branch, &node_kind)?;
        if let Some(descriptor) = schema.relationship_by_identifier(identifier) {
            if descriptor.cardinality != Cardinality::One {
                return Err(GraphError::Validation(ErrorDetails::new(
                    format!("relationships.{identifier}"),
                    ConstraintReason::CardinalityViolation { expected: "one" },
                )));
            }
        }

        let predicate = self.in_lineage(branch);
        let rel_label = EdgeLabel::HasRelationship {
            identifier: identifier.to_string(),
        };
        let current_rel = self
            .store
            .resolve_from(node, at, &predicate)
            .into_iter()
            .find(|e| e.label == rel_label);

        if let Some(current_rel) = &current_rel {
            let current_peer = self
                .store
                .resolve_from(current_rel.target, at, &predicate)
                .into_iter()
                .find(|e| e.label == EdgeLabel::HasPeer);

            if current_rel.branch == branch {
                self.store
                    .close_edge(node, &rel_label, current_rel.target, current_rel.branch, at)?;
            }
            self.store
                .insert_edge(current_rel.tombstone(at, branch, level))?;

            if let Some(current_peer) = &current_peer {
                if current_peer.branch == branch {
                    self.store.close_edge(
                        current_rel.target,
                        &EdgeLabel::HasPeer,
                        current_peer.target,
                        current_peer.branch,
                        at,
                    )?;
                }
                self.store
                    .insert_edge(current_peer.tombstone(at, branch, level))?;
            }
        }

        let rel_id = EntityId::new();
        self.store
            .put_vertex(Vertex::relationship(rel_id, identifier.to_string()));
        self.store
            .insert_edge(Edge::open(node, rel_label, rel_id, branch, level, at))?;
        self.store
            .insert_edge(Edge::open(rel_id, EdgeLabel::HasPeer, peer, branch, level, at))?;

        self.events
            .emit(Event::new(EventKind::NodeUpdated, node, branch, at));
        Ok(())
    }

    /// Add one more peer to a cardinality-many relationship, leaving any
    /// existing peers untouched. Rejects `Cardinality::One` relationships —
    /// [`Self::replace_relationship`] is the correct call there, since a
    /// single-valued relationship always tombstones its old peer rather than
    /// accumulating a second one.
    #[instrument(skip(self))]
    pub async fn add_relationship(
        &self,
        branch: EntityId,
        node: EntityId,
        identifier: &str,
        peer: EntityId,
        at: Timestamp,
    ) -> GraphResult<()> {
        let _guard = self.locks.acquire(branch).await;
        let branch_record = self.registry.get(branch)?;
        let level = branch_record.branch_level;

        let node_kind = self
            .store
            .get_vertex(node)
            .and_then(|v| v.kind)
            .ok_or_else(|| GraphError::node_not_found(node.as_uuid(), branch.to_string()))?;
        let schema = self.resolve_schema(branch, &node_kind)?;
        if let Some(descriptor) = schema.relationship_by_identifier(identifier) {
            if descriptor.cardinality == Cardinality::One {
                return Err(GraphError::Validation(ErrorDetails::new(
                    format!("relationships.{identifier}"),
                    ConstraintReason::CardinalityViolation { expected: "many" },
                )));
            }
        }

        let rel_id = EntityId::new();
        self.store
            .put_vertex(Vertex::relationship(rel_id, identifier.to_string()));
        self.store.insert_edge(Edge::open(
            node,
            EdgeLabel::HasRelationship {
                identifier: identifier.to_string(),
            },
            rel_id,
            branch,
            level,
            at,
        ))?;
        self.store
            .insert_edge(Edge::open(rel_id, EdgeLabel::HasPeer, peer, branch, level, at))?;

        self.events
            .emit(Event::new(EventKind::NodeUpdated, node, branch, at));
        Ok(())
    }

    /// Remove one peer from a cardinality-many relationship, tombstoning
    /// only the `HasRelationship`/`HasPeer` pair pointing at that peer.
    #[instrument(skip(self))]
    pub async fn remove_relationship(
        &self,
        branch: EntityId,
        node: EntityId,
        identifier: &str,
        peer: EntityId,
        at: Timestamp,
    ) -> GraphResult<()> {
        let _guard = self.locks.acquire(branch).await;
        let branch_record = self.registry.get(branch)?;
        let level = branch_record.branch_level;

        let predicate = self.in_lineage(branch);
        let rel_label = EdgeLabel::HasRelationship {
            identifier: identifier.to_string(),
        };
        let matching_rel = self
            .store
            .resolve_from(node, at, &predicate)
            .into_iter()
            .filter(|e| e.label == rel_label)
            .find(|e| {
                self.store
                    .resolve_from(e.target, at, &predicate)
                    .iter()
                    .any(|p| p.label == EdgeLabel::HasPeer && p.target == peer)
            })
            .ok_or_else(|| GraphError::NotFound {
                kind: "relationship",
                id: identifier.to_string(),
                branch: branch.to_string(),
            })?;

        let peer_edge = self
            .store
            .resolve_from(matching_rel.target, at, &predicate)
            .into_iter()
            .find(|e| e.label == EdgeLabel::HasPeer && e.target == peer)
            .expect("matched above");

        if matching_rel.branch == branch {
            self.store
                .close_edge(node, &rel_label, matching_rel.target, matching_rel.branch, at)?;
        }
        self.store
            .insert_edge(matching_rel.tombstone(at, branch, level))?;

        if peer_edge.branch == branch {
            self.store.close_edge(
                matching_rel.target,
                &EdgeLabel::HasPeer,
                peer_edge.target,
                peer_edge.branch,
                at,
            )?;
        }
        self.store
            .insert_edge(peer_edge.tombstone(at, branch, level))?;

        self.events
            .emit(Event::new(EventKind::NodeUpdated, node, branch, at));
        Ok(())
    }

    /// Soft-delete a node: closes its `IsPartOf` edge and writes a deleted
    /// tombstone in its place, so branch diffs can see the removal.
    #[instrument(skip(self))]
    pub async fn delete_node(&self, branch: EntityId, node: EntityId, at: Timestamp) -> GraphResult<()> {
        let _guard = self.locks.acquire(branch).await;
        let branch_record = self.registry.get(branch)?;
        let level = branch_record.branch_level;

        let predicate = self.in_lineage(branch);
        let current = self
            .store
            .resolve_from(self.root, at, &predicate)
            .into_iter()
            .find(|e| e.label == EdgeLabel::IsPartOf && e.target == node)
            .ok_or_else(|| GraphError::node_not_found(node.as_uuid(), branch.to_string()))?;

        // As in `update_attribute`: only close the edge in place when this
        // branch wrote it. A delete inherited from an ancestor is expressed
        // purely as a higher-level tombstone, leaving the ancestor's own
        // edge untouched.
        if current.branch == branch {
            self.store
                .close_edge(self.root, &EdgeLabel::IsPartOf, node, current.branch, at)?;
        }
        self.store.insert_edge(current.tombstone(at, branch, level))?;

        self.events
            .emit(Event::new(EventKind::NodeDeleted, node, branch, at));
        Ok(())
    }
}

fn kind_name(kind: branchgraph_core::ValueKind) -> &'static str {
    match kind {
        branchgraph_core::ValueKind::Text => "text",
        branchgraph_core::ValueKind::Int => "int",
        branchgraph_core::ValueKind::Bool => "bool",
        branchgraph_core::ValueKind::List => "list",
        branchgraph_core::ValueKind::Json => "json",
        branchgraph_core::ValueKind::Ip => "ip",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branchgraph_core::{BranchName, Limits};
    use branchgraph_schema::{AttributeDescriptor, RelationshipDescriptor};
    use branchgraph_store::InMemoryStore;

    fn harness() -> (NodeManager, EntityId) {
        let registry = Arc::new(BranchRegistry::new(BranchName::default_branch(), Limits::standard()));
        let root = registry.root_id();
        let schema = Arc::new(SchemaCache::new());
        schema.register(
            root,
            KindSchema {
                kind: "device".to_string(),
                attributes: vec![AttributeDescriptor {
                    name: "hostname".to_string(),
                    value_kind: branchgraph_core::ValueKind::Text,
                    optional: false,
                    branch_aware: true,
                    choices: None,
                }],
                relationships: vec![
                    RelationshipDescriptor {
                        identifier: "device__interfaces".to_string(),
                        peer_kind: "interface".to_string(),
                        cardinality: Cardinality::Many,
                        optional: true,
                    },
                    RelationshipDescriptor {
                        identifier: "device__primary_ip".to_string(),
                        peer_kind: "ip_address".to_string(),
                        cardinality: Cardinality::One,
                        optional: true,
                    },
                ],
            },
        );
        let store: Arc<dyn GraphStore> = Arc::new(InMemoryStore::new());
        let events = Arc::new(EventEmitter::new(64));
        let locks = Arc::new(BranchLocks::new());
        (NodeManager::new(store, registry, schema, events, locks), root)
    }

    #[tokio::test]
    async fn create_requires_required_attribute() {
        let (manager, root) = harness();
        let err = manager
            .create_node(root, "device", NewNode::default(), Timestamp::now())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[tokio::test]
    async fn create_update_delete_round_trip() {
        let (manager, root) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let t0 = Timestamp::from_micros(1_000);
        let node = manager.create_node(root, "device", new, t0).await.unwrap();

        let t1 = Timestamp::from_micros(2_000);
        manager
            .update_attribute(root, node, "hostname", Value::Text("r2".into()), t1)
            .await
            .unwrap();

        let t2 = Timestamp::from_micros(3_000);
        manager.delete_node(root, node, t2).await.unwrap();
    }

    #[tokio::test]
    async fn create_node_rejects_relationship_to_deleted_peer() {
        let (manager, root) = harness();
        let mut peer_new = NewNode::default();
        peer_new.attributes.insert("hostname".to_string(), Value::Text("peer".into()));
        let peer = manager
            .create_node(root, "device", peer_new, Timestamp::from_micros(1_000))
            .await
            .unwrap();
        manager.delete_node(root, peer, Timestamp::from_micros(2_000)).await.unwrap();

        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        new.relationships
            .insert("device__interfaces".to_string(), vec![peer]);
        let err = manager
            .create_node(root, "device", new, Timestamp::from_micros(3_000))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_node_rejects_relationship_to_nonexistent_peer() {
        let (manager, root) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        new.relationships
            .insert("device__interfaces".to_string(), vec![EntityId::new()]);
        let err = manager
            .create_node(root, "device", new, Timestamp::from_micros(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));
    }

    #[tokio::test]
    async fn replace_relationship_tombstones_old_peer() {
        let (manager, root) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let t0 = Timestamp::from_micros(1_000);
        let node = manager.create_node(root, "device", new, t0).await.unwrap();

        let peer_a = EntityId::new();
        let peer_b = EntityId::new();
        let t1 = Timestamp::from_micros(2_000);
        manager
            .replace_relationship(root, node, "device__primary_ip", peer_a, t1)
            .await
            .unwrap();

        let t2 = Timestamp::from_micros(3_000);
        manager
            .replace_relationship(root, node, "device__primary_ip", peer_b, t2)
            .await
            .unwrap();

        let predicate = manager.in_lineage(root);
        let winners = manager.store.resolve_from(node, t2, &predicate);
        let rel = winners
            .iter()
            .find(|e| e.label == EdgeLabel::HasRelationship {
                identifier: "device__primary_ip".to_string(),
            })
            .unwrap();
        let peers = manager.store.resolve_from(rel.target, t2, &predicate);
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].target, peer_b);

        let winners_before = manager.store.resolve_from(node, Timestamp::from_micros(2_500), &predicate);
        let rel_before = winners_before
            .iter()
            .find(|e| e.label == EdgeLabel::HasRelationship {
                identifier: "device__primary_ip".to_string(),
            })
            .unwrap();
        let peers_before = manager
            .store
            .resolve_from(rel_before.target, Timestamp::from_micros(2_500), &predicate);
        assert_eq!(peers_before[0].target, peer_a);
    }

    #[tokio::test]
    async fn replace_relationship_rejects_cardinality_many() {
        let (manager, root) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let t0 = Timestamp::from_micros(1_000);
        let node = manager.create_node(root, "device", new, t0).await.unwrap();

        let err = manager
            .replace_relationship(root, node, "device__interfaces", EntityId::new(), Timestamp::from_micros(2_000))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[tokio::test]
    async fn add_relationship_accumulates_peers() {
        let (manager, root) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let t0 = Timestamp::from_micros(1_000);
        let node = manager.create_node(root, "device", new, t0).await.unwrap();

        let peer_a = EntityId::new();
        let peer_b = EntityId::new();
        manager
            .add_relationship(root, node, "device__interfaces", peer_a, Timestamp::from_micros(2_000))
            .await
            .unwrap();
        manager
            .add_relationship(root, node, "device__interfaces", peer_b, Timestamp::from_micros(3_000))
            .await
            .unwrap();

        let predicate = manager.in_lineage(root);
        let at = Timestamp::from_micros(4_000);
        let rel_label = EdgeLabel::HasRelationship {
            identifier: "device__interfaces".to_string(),
        };
        let mut peers: Vec<EntityId> = manager
            .store
            .resolve_from(node, at, &predicate)
            .into_iter()
            .filter(|e| e.label == rel_label)
            .flat_map(|e| {
                manager
                    .store
                    .resolve_from(e.target, at, &predicate)
                    .into_iter()
                    .filter(|p| p.label == EdgeLabel::HasPeer)
                    .map(|p| p.target)
                    .collect::<Vec<_>>()
            })
            .collect();
        peers.sort();
        let mut expected = vec![peer_a, peer_b];
        expected.sort();
        assert_eq!(peers, expected);
    }

    #[tokio::test]
    async fn add_relationship_rejects_cardinality_one() {
        let (manager, root) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let t0 = Timestamp::from_micros(1_000);
        let node = manager.create_node(root, "device", new, t0).await.unwrap();

        let err = manager
            .add_relationship(root, node, "device__primary_ip", EntityId::new(), Timestamp::from_micros(2_000))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[tokio::test]
    async fn remove_relationship_drops_only_matching_peer() {
        let (manager, root) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let t0 = Timestamp::from_micros(1_000);
        let node = manager.create_node(root, "device", new, t0).await.unwrap();

        let peer_a = EntityId::new();
        let peer_b = EntityId::new();
        manager
            .add_relationship(root, node, "device__interfaces", peer_a, Timestamp::from_micros(2_000))
            .await
            .unwrap();
        manager
            .add_relationship(root, node, "device__interfaces", peer_b, Timestamp::from_micros(3_000))
            .await
            .unwrap();

        let t3 = Timestamp::from_micros(4_000);
        manager
            .remove_relationship(root, node, "device__interfaces", peer_a, t3)
            .await
            .unwrap();

        let predicate = manager.in_lineage(root);
        let rel_label = EdgeLabel::HasRelationship {
            identifier: "device__interfaces".to_string(),
        };
        let remaining: Vec<EntityId> = manager
            .store
            .resolve_from(node, t3, &predicate)
            .into_iter()
            .filter(|e| e.label == rel_label)
            .flat_map(|e| {
                manager
                    .store
                    .resolve_from(e.target, t3, &predicate)
                    .into_iter()
                    .filter(|p| p.label == EdgeLabel::HasPeer)
                    .map(|p| p.target)
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(remaining, vec![peer_b]);

        let before: Vec<EntityId> = manager
            .store
            .resolve_from(node, Timestamp::from_micros(3_500), &predicate)
            .into_iter()
            .filter(|e| e.label == rel_label)
            .flat_map(|e| {
                manager
                    .store
                    .resolve_from(e.target, Timestamp::from_micros(3_500), &predicate)
                    .into_iter()
                    .filter(|p| p.label == EdgeLabel::HasPeer)
                    .map(|p| p.target)
                    .collect::<Vec<_>>()
            })
            .collect();
        let mut before_sorted = before;
        before_sorted.sort();
        let mut expected = vec![peer_a, peer_b];
        expected.sort();
        assert_eq!(before_sorted, expected);
    }
}
