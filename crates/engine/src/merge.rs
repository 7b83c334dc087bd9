//! Replaying a branch's delta onto its parent
//!
//! A merge is implemented as a replay, not a rebase-in-place: every edge
//! the source branch wrote gets a matching edge written fresh on the
//! target (parent) branch, tagged with the target's own branch/level. The
//! source branch's edges are never mutated or re-tagged — they stay exactly
//! as they were, so the source's own history keeps reading correctly even
//! after it's merged and soft-deleted.
//!
//! A conflict is an attribute the *target* branch also changed after the
//! source branch forked from it — a genuine three-way divergence, not just
//! "the source changed it while the target didn't." Resolving a conflict
//! requires the caller to supply a [`MergeResolution`] for that path;
//! without one the whole merge fails with `GraphError::MergeConflict`
//! rather than silently picking a winner.

use crate::diff::{DiffAction, DiffEngine, NodeDiff};
use branchgraph_concurrency::BranchLocks;
use branchgraph_core::{EntityId, GraphError, GraphResult, MergeConflictEntry, Timestamp};
use branchgraph_events::{Event, EventEmitter, EventKind};
use branchgraph_registry::BranchRegistry;
use branchgraph_schema::SchemaCache;
use branchgraph_store::{Edge, EdgeLabel, GraphStore, Vertex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Which side wins a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResolution {
    /// Keep the source (merging) branch's value.
    Source,
    /// Keep the target (parent) branch's value.
    Target,
}

/// Summary of a completed merge.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Nodes added on the target branch as a result of the merge.
    pub nodes_added: usize,
    /// Nodes tombstoned on the target branch as a result of the merge.
    pub nodes_removed: usize,
    /// Attribute/relationship changes replayed onto existing target nodes.
    pub fields_updated: usize,
    /// Conflicts that were resolved via the caller's resolution map.
    pub conflicts_resolved: usize,
}

/// Replays a branch's changes onto its parent and soft-deletes the branch.
pub struct MergeEngine {
    store: Arc<dyn GraphStore>,
    registry: Arc<BranchRegistry>,
    schema: Arc<SchemaCache>,
    events: Arc<EventEmitter>,
    locks: Arc<BranchLocks>,
    root: EntityId,
}

impl MergeEngine {
    /// Wire a merge engine over the given collaborators.
    ///
    /// `root` must match the graph's shared `Root` vertex, as with
    /// [`crate::diff::DiffEngine`].
    pub fn new(
        store: Arc<dyn GraphStore>,
        registry: Arc<BranchRegistry>,
        schema: Arc<SchemaCache>,
        events: Arc<EventEmitter>,
        locks: Arc<BranchLocks>,
        root: EntityId,
    ) -> Self {
        MergeEngine {
            store,
            registry,
            schema,
            events,
            locks,
            root,
        }
    }

    /// Merge `source` into its parent, applying `resolutions` to any
    /// detected conflicts keyed `"{node}.{attribute}"`.
    pub async fn merge(
        &self,
        source: EntityId,
        resolutions: &HashMap<String, MergeResolution>,
        at: Timestamp,
    ) -> GraphResult<MergeOutcome> {
        let record = self.registry.get(source)?;
        let parent = record.parent.ok_or_else(|| {
            GraphError::Fatal("cannot merge the root branch, it has no parent".to_string())
        })?;
        let parent_record = self.registry.get(parent)?;

        // Lock both branches in a fixed order (by id) so two concurrent
        // merges that share a branch never deadlock against each other.
        let (first, second) = if source < parent { (source, parent) } else { (parent, source) };
        let _first_guard = self.locks.acquire(first).await;
        let _second_guard = self.locks.acquire(second).await;

        let diff_engine = DiffEngine::new(self.store.clone(), self.registry.clone(), self.root);
        let diffs = diff_engine.diff_branch(source, at)?;

        for diff in &diffs {
            if let Some(kind) = &diff.kind {
                self.schema.check_compatible(source, parent, kind)?;
            }
        }

        let mut outcome = MergeOutcome::default();
        let mut conflicts = Vec::new();
        self.plan(&diffs, source, parent, record.branched_from, resolutions, &mut conflicts)?;
        if !conflicts.is_empty() {
            return Err(GraphError::MergeConflict { conflicts });
        }

        for diff in &diffs {
            self.apply(diff, source, parent, parent_record.branch_level, resolutions, at, &mut outcome)?;
        }

        self.registry.delete(source)?;
        self.events.emit(Event::new(
            EventKind::BranchMerged {
                conflicts_resolved: outcome.conflicts_resolved,
            },
            source,
            parent,
            at,
        ));
        info!(%source, %parent, nodes_added = outcome.nodes_added, "branch merged");
        Ok(outcome)
    }

    /// Preview what [`Self::merge`] would report, without mutating
    /// anything: runs the same diff against the parent and the same
    /// conflict detection, but never applies or deletes the branch. Used to
    /// back `BranchValidate` so a caller can check for conflicts before
    /// committing to a merge.
    pub fn validate(&self, source: EntityId, at: Timestamp) -> GraphResult<Vec<MergeConflictEntry>> {
        let record = self.registry.get(source)?;
        let parent = record.parent.ok_or_else(|| {
            GraphError::Fatal("cannot validate the root branch, it has no parent".to_string())
        })?;

        let diff_engine = DiffEngine::new(self.store.clone(), self.registry.clone(), self.root);
        let diffs = diff_engine.diff_branch(source, at)?;

        let mut conflicts = Vec::new();
        self.plan(&diffs, source, parent, record.branched_from, &HashMap::new(), &mut conflicts)?;
        Ok(conflicts)
    }

    /// Detect conflicts without mutating anything: an attribute update is a
    /// conflict iff the target branch itself wrote a new value for the same
    /// attribute after the source branch's fork point.
    fn plan(
        &self,
        diffs: &[NodeDiff],
        _source: EntityId,
        parent: EntityId,
        forked_at: Timestamp,
        resolutions: &HashMap<String, MergeResolution>,
        conflicts: &mut Vec<MergeConflictEntry>,
    ) -> GraphResult<()> {
        for diff in diffs {
            if diff.action != DiffAction::Updated {
                continue;
            }
            for attr in &diff.attributes {
                if !self.target_changed_since_fork(diff.node, &attr.name, parent, forked_at) {
                    continue;
                }
                let path = format!("{}.{}", diff.node, attr.name);
                if !resolutions.contains_key(&path) {
                    conflicts.push(MergeConflictEntry {
                        path,
                        source_value: format_opt(&attr.after),
                        target_value: format_opt(&attr.before),
                    });
                }
            }
        }
        Ok(())
    }

    fn target_changed_since_fork(
        &self,
        node: EntityId,
        attr_name: &str,
        parent: EntityId,
        forked_at: Timestamp,
    ) -> bool {
        let Some(attr_id) = self.find_attribute_id(node, attr_name) else {
            return false;
        };
        self.store.edges_from(attr_id).into_iter().any(|e| {
            e.label == EdgeLabel::HasValue && e.branch == parent && e.from > forked_at
        })
    }

    fn find_attribute_id(&self, node: EntityId, name: &str) -> Option<EntityId> {
        self.store
            .edges_from(node)
            .into_iter()
            .filter(|e| e.label == EdgeLabel::HasAttribute)
            .find(|e| {
                self.store
                    .get_vertex(e.target)
                    .map(|v| v.name.as_deref() == Some(name))
                    .unwrap_or(false)
            })
            .map(|e| e.target)
    }

    fn apply(
        &self,
        diff: &NodeDiff,
        source: EntityId,
        parent: EntityId,
        parent_level: u32,
        resolutions: &HashMap<String, MergeResolution>,
        at: Timestamp,
        outcome: &mut MergeOutcome,
    ) -> GraphResult<()> {
        match diff.action {
            DiffAction::Added => {
                self.store.insert_edge(Edge::open(
                    self.root,
                    EdgeLabel::IsPartOf,
                    diff.node,
                    parent,
                    parent_level,
                    at,
                ))?;
                self.replay_attributes(diff.node, source, parent, parent_level, at)?;
                self.replay_relationships(diff.node, source, parent, parent_level, at)?;
                outcome.nodes_added += 1;
            }
            DiffAction::Removed => {
                self.store.insert_edge(Edge {
                    source: self.root,
                    label: EdgeLabel::IsPartOf,
                    target: diff.node,
                    branch: parent,
                    branch_level: parent_level,
                    status: branchgraph_store::EdgeStatus::Deleted,
                    from: at,
                    to: None,
                })?;
                outcome.nodes_removed += 1;
            }
            DiffAction::Updated => {
                for attr in &diff.attributes {
                    let path = format!("{}.{}", diff.node, attr.name);
                    let winning_value = match resolutions.get(&path) {
                        Some(MergeResolution::Target) => attr.before.clone(),
                        _ => attr.after.clone(),
                    };
                    if resolutions.contains_key(&path) {
                        outcome.conflicts_resolved += 1;
                    }
                    if let Some(value) = winning_value {
                        if let Some(attr_id) = self.find_attribute_id(diff.node, &attr.name) {
                            let value_id = EntityId::new();
                            self.store.put_vertex(Vertex::attribute_value(value_id, value));
                            self.store.insert_edge(Edge::open(
                                attr_id,
                                EdgeLabel::HasValue,
                                value_id,
                                parent,
                                parent_level,
                                at,
                            ))?;
                            outcome.fields_updated += 1;
                        }
                    }
                }
                if !diff.relationships.is_empty() {
                    self.replay_relationships(diff.node, source, parent, parent_level, at)?;
                }
            }
        }
        Ok(())
    }

    fn replay_attributes(
        &self,
        node: EntityId,
        source: EntityId,
        parent: EntityId,
        parent_level: u32,
        at: Timestamp,
    ) -> GraphResult<()> {
        for attr_edge in self.store.edges_from(node) {
            if attr_edge.label != EdgeLabel::HasAttribute || attr_edge.branch != source {
                continue;
            }
            let name = self
                .store
                .get_vertex(attr_edge.target)
                .and_then(|v| v.name)
                .unwrap_or_default();
            let value = self
                .store
                .edges_from(attr_edge.target)
                .into_iter()
                .find(|e| e.label == EdgeLabel::HasValue && e.branch == source && e.to.is_none())
                .and_then(|e| self.store.get_vertex(e.target))
                .and_then(|v| v.value);
            let Some(value) = value else { continue };

            let attr_id = EntityId::new();
            self.store.put_vertex(Vertex::attribute(attr_id, name));
            self.store.insert_edge(Edge::open(
                node,
                EdgeLabel::HasAttribute,
                attr_id,
                parent,
                parent_level,
                at,
            ))?;
            let value_id = EntityId::new();
            self.store.put_vertex(Vertex::attribute_value(value_id, value));
            self.store.insert_edge(Edge::open(
                attr_id,
                EdgeLabel::HasValue,
                value_id,
                parent,
                parent_level,
                at,
            ))?;
        }
        Ok(())
    }

    fn replay_relationships(
        &self,
        node: EntityId,
        source: EntityId,
        parent: EntityId,
        parent_level: u32,
        at: Timestamp,
    ) -> GraphResult<()> {
        for rel_edge in self.store.edges_from(node) {
            let EdgeLabel::HasRelationship { identifier } = &rel_edge.label else {
                continue;
            };
            if rel_edge.branch != source {
                continue;
            }
            let peers: Vec<EntityId> = self
                .store
                .edges_from(rel_edge.target)
                .into_iter()
                .filter(|e| e.label == EdgeLabel::HasPeer && e.to.is_none())
                .map(|e| e.target)
                .collect();
            for peer in peers {
                let rel_id = EntityId::new();
                self.store
                    .put_vertex(Vertex::relationship(rel_id, identifier.clone()));
                self.store.insert_edge(Edge::open(
                    node,
                    EdgeLabel::HasRelationship {
                        identifier: identifier.clone(),
                    },
                    rel_id,
                    parent,
                    parent_level,
                    at,
                ))?;
                self.store
                    .insert_edge(Edge::open(rel_id, EdgeLabel::HasPeer, peer, parent, parent_level, at))?;
            }
        }
        Ok(())
    }
}

fn format_opt(value: &Option<branchgraph_core::Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<none>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_manager::{NewNode, NodeManager};
    use branchgraph_core::{BranchName, Limits, Value};
    use branchgraph_schema::{AttributeDescriptor, KindSchema};
    use branchgraph_store::InMemoryStore;

    fn harness() -> (Arc<NodeManager>, Arc<MergeEngine>, EntityId, Arc<BranchRegistry>) {
        let registry = Arc::new(BranchRegistry::new(BranchName::default_branch(), Limits::standard()));
        let root_branch = registry.root_id();
        let schema = Arc::new(SchemaCache::new());
        schema.register(
            root_branch,
            KindSchema {
                kind: "device".to_string(),
                attributes: vec![AttributeDescriptor {
                    name: "hostname".to_string(),
                    value_kind: branchgraph_core::ValueKind::Text,
                    optional: false,
                    branch_aware: true,
                    choices: None,
                }],
                relationships: vec![branchgraph_schema::RelationshipDescriptor {
                    identifier: "device__interfaces".to_string(),
                    peer_kind: "device".to_string(),
                    cardinality: branchgraph_schema::Cardinality::Many,
                    optional: true,
                }],
            },
        );
        let store: Arc<dyn GraphStore> = Arc::new(InMemoryStore::new());
        let events = Arc::new(EventEmitter::new(64));
        let locks = Arc::new(BranchLocks::new());
        let manager = Arc::new(NodeManager::new(
            store.clone(),
            registry.clone(),
            schema.clone(),
            events.clone(),
            locks.clone(),
        ));
        let root_vertex = manager.root_vertex();
        let merge = Arc::new(MergeEngine::new(store, registry.clone(), schema, events, locks, root_vertex));
        (manager, merge, root_branch, registry)
    }

    #[tokio::test]
    async fn merge_adds_new_node_to_parent() {
        let (manager, merge, root_branch, registry) = harness();
        let feature = registry
            .create(BranchName::new("feature").unwrap(), root_branch)
            .unwrap();

        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        manager
            .create_node(feature.id, "device", new, Timestamp::from_micros(1_000))
            .await
            .unwrap();

        let outcome = merge
            .merge(feature.id, &HashMap::new(), Timestamp::from_micros(2_000))
            .await
            .unwrap();
        assert_eq!(outcome.nodes_added, 1);
        assert!(registry.get(feature.id).unwrap().status == branchgraph_registry::BranchStatus::Deleted);
    }

    #[tokio::test]
    async fn merge_without_parent_change_has_no_conflicts() {
        let (manager, merge, root_branch, registry) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let node = manager
            .create_node(root_branch, "device", new, Timestamp::from_micros(0))
            .await
            .unwrap();

        let feature = registry
            .create(BranchName::new("feature").unwrap(), root_branch)
            .unwrap();
        manager
            .update_attribute(feature.id, node, "hostname", Value::Text("r2".into()), Timestamp::from_micros(1_000))
            .await
            .unwrap();

        let outcome = merge
            .merge(feature.id, &HashMap::new(), Timestamp::from_micros(2_000))
            .await
            .unwrap();
        assert_eq!(outcome.fields_updated, 1);
    }

    #[tokio::test]
    async fn validate_reports_conflict_without_mutating() {
        let (manager, merge, root_branch, registry) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let node = manager
            .create_node(root_branch, "device", new, Timestamp::from_micros(0))
            .await
            .unwrap();

        let feature = registry
            .create(BranchName::new("feature").unwrap(), root_branch)
            .unwrap();
        manager
            .update_attribute(feature.id, node, "hostname", Value::Text("from-feature".into()), Timestamp::from_micros(1_000))
            .await
            .unwrap();
        manager
            .update_attribute(root_branch, node, "hostname", Value::Text("from-main".into()), Timestamp::from_micros(1_500))
            .await
            .unwrap();

        let conflicts = merge.validate(feature.id, Timestamp::from_micros(2_000)).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].path.contains("hostname"));

        // validate must not have deleted the branch or applied anything.
        assert!(registry.get(feature.id).unwrap().is_active());
    }

    #[tokio::test]
    async fn merge_replays_relationship_only_update() {
        let (manager, merge, root_branch, registry) = harness();
        let mut new = NewNode::default();
        new.attributes.insert("hostname".to_string(), Value::Text("r1".into()));
        let node = manager
            .create_node(root_branch, "device", new, Timestamp::from_micros(0))
            .await
            .unwrap();
        let mut peer_new = NewNode::default();
        peer_new.attributes.insert("hostname".to_string(), Value::Text("eth0".into()));
        let peer = manager
            .create_node(root_branch, "device", peer_new, Timestamp::from_micros(0))
            .await
            .unwrap();

        let feature = registry
            .create(BranchName::new("feature").unwrap(), root_branch)
            .unwrap();
        manager
            .add_relationship(feature.id, node, "device__interfaces", peer, Timestamp::from_micros(1_000))
            .await
            .unwrap();

        let outcome = merge
            .merge(feature.id, &HashMap::new(), Timestamp::from_micros(2_000))
            .await
            .unwrap();
        assert_eq!(outcome.nodes_added, 0);

        let peers: Vec<EntityId> = merge
            .store
            .edges_from(node)
            .into_iter()
            .filter(|e| {
                matches!(&e.label, EdgeLabel::HasRelationship { identifier } if identifier == "device__interfaces")
                    && e.branch == root_branch
                    && e.to.is_none()
            })
            .flat_map(|rel_edge| {
                merge
                    .store
                    .edges_from(rel_edge.target)
                    .into_iter()
                    .filter(|e| e.label == EdgeLabel::HasPeer && e.to.is_none())
                    .map(|e| e.target)
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(peers, vec![peer]);
    }
}
