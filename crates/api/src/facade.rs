//! The facade operations named in the external-interfaces contract
//!
//! Every method here is a thin, owned-type wrapper over a lower-level
//! collaborator on [`Context`]: branch name parsing/validation, id
//! translation between wire `Uuid`s and internal [`EntityId`]s, and DTO
//! conversion, with no behavior of its own beyond that. The actual
//! semantics (visibility, precedence, tombstoning, conflict detection) all
//! live in `branchgraph-engine`/`branchgraph-registry`.

use crate::context::Context;
use crate::types::{
    BranchSummary, BranchUpdate, DiffSummary, NewBranch, NewNode, NodeDiffSummary, NodeQuery,
    NodeSummary,
};
use branchgraph_core::{
    BranchName, ConstraintReason, EntityId, ErrorDetails, GraphError, GraphResult,
    MergeConflictEntry, Timestamp, Value,
};
use branchgraph_engine::{MergeOutcome, NodeFilter};
use branchgraph_schema::KindSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

impl Context {
    /// `BranchCreate`: fork a new branch from `parent` (the default branch
    /// if omitted).
    #[instrument(skip(self))]
    pub fn branch_create(&self, request: NewBranch) -> GraphResult<BranchSummary> {
        let name = BranchName::new(request.name)?;
        let parent = match request.parent {
            Some(id) => EntityId::from_uuid(id),
            None => self.registry.root_id(),
        };
        let record = self.registry.create(name, parent)?;
        if request.description.is_some() {
            self.registry.update_description(record.id, request.description)?;
        }
        Ok(self.registry.get(record.id)?.into())
    }

    /// `BranchDelete`: soft-delete a branch. Its history remains reachable
    /// from any branch forked off it.
    #[instrument(skip(self))]
    pub fn branch_delete(&self, branch: Uuid) -> GraphResult<()> {
        self.registry.delete(EntityId::from_uuid(branch))
    }

    /// `BranchRebase`: re-parent a branch onto a new parent, advancing its
    /// `branched_from` fork point to now.
    #[instrument(skip(self))]
    pub fn branch_rebase(&self, branch: Uuid, new_parent: Uuid) -> GraphResult<BranchSummary> {
        let record = self
            .registry
            .rebase(EntityId::from_uuid(branch), EntityId::from_uuid(new_parent))?;
        Ok(record.into())
    }

    /// `BranchValidate`: preview the conflicts a `BranchMerge` of `branch`
    /// would report, without mutating anything.
    #[instrument(skip(self))]
    pub fn branch_validate(&self, branch: Uuid, at: Timestamp) -> GraphResult<Vec<MergeConflictEntry>> {
        self.merge.validate(EntityId::from_uuid(branch), at)
    }

    /// `BranchMerge`: replay `branch`'s changes onto its parent and
    /// soft-delete it. `resolutions` supplies a winner for every conflict
    /// `BranchValidate` would have reported; an unresolved conflict fails
    /// the whole merge.
    #[instrument(skip(self, resolutions))]
    pub async fn branch_merge(
        &self,
        branch: Uuid,
        resolutions: &HashMap<String, branchgraph_engine::MergeResolution>,
        at: Timestamp,
    ) -> GraphResult<MergeOutcome> {
        self.merge.merge(EntityId::from_uuid(branch), resolutions, at).await
    }

    /// `BranchUpdate`: set a branch's free-form description.
    #[instrument(skip(self))]
    pub fn branch_update(&self, branch: Uuid, update: BranchUpdate) -> GraphResult<BranchSummary> {
        let record = self
            .registry
            .update_description(EntityId::from_uuid(branch), update.description)?;
        Ok(record.into())
    }

    /// `BranchQuery`: list every active branch.
    #[instrument(skip(self))]
    pub fn branch_query(&self) -> Vec<BranchSummary> {
        self.registry.list().into_iter().map(Into::into).collect()
    }

    /// `NodeCreate`.
    #[instrument(skip(self, request))]
    pub async fn node_create(&self, branch: Uuid, request: NewNode, at: Timestamp) -> GraphResult<Uuid> {
        let new = branchgraph_engine::node_manager::NewNode {
            attributes: request.attributes,
            relationships: request
                .relationships
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().map(EntityId::from_uuid).collect()))
                .collect(),
            attribute_sources: request
                .attribute_sources
                .into_iter()
                .map(|(k, v)| (k, EntityId::from_uuid(v)))
                .collect(),
            attribute_owners: request
                .attribute_owners
                .into_iter()
                .map(|(k, v)| (k, EntityId::from_uuid(v)))
                .collect(),
        };
        let id = self
            .nodes
            .create_node(EntityId::from_uuid(branch), &request.kind, new, at)
            .await?;
        Ok(id.as_uuid())
    }

    /// `NodeUpdate`: set a single attribute's value.
    #[instrument(skip(self, value))]
    pub async fn node_update(
        &self,
        branch: Uuid,
        node: Uuid,
        attribute: &str,
        value: Value,
        at: Timestamp,
    ) -> GraphResult<()> {
        self.nodes
            .update_attribute(EntityId::from_uuid(branch), EntityId::from_uuid(node), attribute, value, at)
            .await
    }

    /// `NodeDelete`.
    #[instrument(skip(self))]
    pub async fn node_delete(&self, branch: Uuid, node: Uuid, at: Timestamp) -> GraphResult<()> {
        self.nodes
            .delete_node(EntityId::from_uuid(branch), EntityId::from_uuid(node), at)
            .await
    }

    /// `NodeGet`: resolve one node's visible state at `(branch, at)`.
    /// `include_source` additionally resolves each attribute's
    /// `HasSource`/`HasOwner` provenance.
    #[instrument(skip(self))]
    pub fn node_get(&self, branch: Uuid, node: Uuid, at: Timestamp, include_source: bool) -> GraphResult<NodeSummary> {
        let resolved = self
            .query
            .get_one(EntityId::from_uuid(branch), EntityId::from_uuid(node), at, include_source)?;
        Ok(resolved.into())
    }

    /// `NodeQuery`: a filtered kind scan. Each filter's dotted field name is
    /// parsed against `request.kind`'s schema; an unrecognised slot or
    /// property is a `Validation` error rather than a silently-empty result.
    #[instrument(skip(self, request))]
    pub fn node_query(&self, branch: Uuid, request: NodeQuery, at: Timestamp) -> GraphResult<Vec<NodeSummary>> {
        let branch_id = EntityId::from_uuid(branch);
        let schema = self.resolve_schema(branch_id, &request.kind)?;
        let filters = request
            .filters
            .into_iter()
            .map(|f| parse_filter(&schema, &f.field, f.value))
            .collect::<GraphResult<Vec<NodeFilter>>>()?;
        let results = self
            .query
            .query(branch_id, &request.kind, &filters, request.limit, at)?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    /// Resolve `kind`'s schema visible on `branch`, walking the branch's
    /// lineage toward the root. Mirrors
    /// `branchgraph_engine::node_manager::NodeManager::resolve_schema`,
    /// without the write side's caching of the resolved schema onto `branch`.
    fn resolve_schema(&self, branch: EntityId, kind: &str) -> GraphResult<Arc<KindSchema>> {
        if let Some(schema) = self.schema.get(branch, kind) {
            return Ok(schema);
        }
        let lineage = self.registry.lineage();
        for ancestor in lineage.chain(branch) {
            if let Some(schema) = self.schema.get(ancestor, kind) {
                return Ok(schema);
            }
        }
        Err(GraphError::NotFound {
            kind: "schema",
            id: kind.to_string(),
            branch: branch.to_string(),
        })
    }

    /// `RelationshipAdd`: append a peer to a cardinality-many relationship,
    /// or replace the peer of a cardinality-one one.
    #[instrument(skip(self))]
    pub async fn relationship_add(
        &self,
        branch: Uuid,
        node: Uuid,
        identifier: &str,
        peer: Uuid,
        at: Timestamp,
    ) -> GraphResult<()> {
        let branch = EntityId::from_uuid(branch);
        let node = EntityId::from_uuid(node);
        let peer = EntityId::from_uuid(peer);
        match self.nodes.add_relationship(branch, node, identifier, peer, at).await {
            Err(branchgraph_core::GraphError::Validation(details)) => {
                let is_cardinality_one = matches!(
                    details.reason,
                    branchgraph_core::ConstraintReason::CardinalityViolation { expected: "many" }
                );
                if is_cardinality_one {
                    self.nodes.replace_relationship(branch, node, identifier, peer, at).await
                } else {
                    Err(branchgraph_core::GraphError::Validation(details))
                }
            }
            other => other,
        }
    }

    /// `RelationshipRemove`: drop a specific peer from a relationship.
    #[instrument(skip(self))]
    pub async fn relationship_remove(
        &self,
        branch: Uuid,
        node: Uuid,
        identifier: &str,
        peer: Uuid,
        at: Timestamp,
    ) -> GraphResult<()> {
        self.nodes
            .remove_relationship(
                EntityId::from_uuid(branch),
                EntityId::from_uuid(node),
                identifier,
                EntityId::from_uuid(peer),
                at,
            )
            .await
    }

    /// `DiffSummary(branch, from?, to?, branch_only?)`: what `branch`
    /// changed relative to its parent.
    ///
    /// The underlying [`branchgraph_engine::DiffEngine`] compares a single
    /// `(branch, at)` snapshot against the parent's view at the same
    /// instant rather than an arbitrary `[from, to]` window; `from` is
    /// accepted for wire-shape compatibility but unused, since branch-only
    /// diffing (the only mode implemented) is already anchored at the
    /// branch's fork point. See `DESIGN.md` for the full resolution.
    #[instrument(skip(self))]
    pub fn diff_summary(&self, branch: Uuid, _from: Option<Timestamp>, to: Timestamp) -> GraphResult<DiffSummary> {
        let branch = EntityId::from_uuid(branch);
        let name = self.registry.get(branch)?.name.as_str().to_string();
        let diffs = self.diff.diff_branch(branch, to)?;
        let summaries: Vec<NodeDiffSummary> = diffs.into_iter().map(Into::into).collect();
        let mut by_branch = HashMap::new();
        by_branch.insert(name, summaries);
        Ok(DiffSummary { by_branch })
    }
}

/// Desugar one dotted `NodeQuery` filter field against `schema`. The first
/// segment must name a declared attribute or relationship slot; the
/// remainder addresses a property on that slot. Matching is done by
/// prefix against the schema's own names rather than a blind `split("__")`,
/// since relationship identifiers (e.g. `device__interfaces`) already
/// contain `__` themselves.
fn parse_filter(schema: &KindSchema, field: &str, value: Value) -> GraphResult<NodeFilter> {
    for attr in &schema.attributes {
        let Some(rest) = field.strip_prefix(&attr.name).and_then(|r| r.strip_prefix("__")) else {
            continue;
        };
        return match rest {
            "value" => Ok(NodeFilter::AttributeEquals(attr.name.clone(), value)),
            "is_visible" => Ok(NodeFilter::IsVisible(attr.name.clone(), expect_bool(field, value)?)),
            "is_protected" => Ok(NodeFilter::IsProtected(attr.name.clone(), expect_bool(field, value)?)),
            _ => Err(unknown_filter_field(field)),
        };
    }
    for rel in &schema.relationships {
        let Some(rest) = field.strip_prefix(&rel.identifier).and_then(|r| r.strip_prefix("__")) else {
            continue;
        };
        if rest == "is_visible" {
            return Ok(NodeFilter::IsVisible(rel.identifier.clone(), expect_bool(field, value)?));
        }
        if rest == "is_protected" {
            return Ok(NodeFilter::IsProtected(rel.identifier.clone(), expect_bool(field, value)?));
        }
        return match rest.strip_suffix("__value") {
            Some(peer_attribute) if !peer_attribute.is_empty() => Ok(NodeFilter::RelationshipPath {
                identifier: rel.identifier.clone(),
                peer_attribute: peer_attribute.to_string(),
                value,
            }),
            _ => Err(unknown_filter_field(field)),
        };
    }
    Err(unknown_filter_field(field))
}

fn expect_bool(field: &str, value: Value) -> GraphResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(GraphError::Validation(ErrorDetails::new(
            field.to_string(),
            ConstraintReason::TypeMismatch {
                expected: "bool",
                actual: kind_label(&other),
            },
        ))),
    }
}

fn kind_label(value: &Value) -> &'static str {
    match value {
        Value::Text(_) => "text",
        Value::Int(_) => "int",
        Value::Bool(_) => "bool",
        Value::List(_) => "list",
        Value::Json(_) => "json",
        Value::Ip(_) => "ip",
    }
}

fn unknown_filter_field(field: &str) -> GraphError {
    GraphError::Validation(ErrorDetails::new(
        field.to_string(),
        ConstraintReason::Other(format!("unrecognised filter field '{field}'")),
    ))
}
