//! The schema cache: resolved `(branch, kind)` schema lookup

use crate::descriptor::KindSchema;
use crate::hash::schema_hash;
use branchgraph_core::{EntityId, GraphError, GraphResult};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Caches resolved schemas per `(branch, kind)` and answers merge
/// compatibility questions between two branches' views of the same kind.
///
/// A branch that has never registered its own schema for a kind is expected
/// to inherit the parent's — that resolution happens one layer up, in the
/// engine, which walks the branch's lineage and registers the first schema
/// it finds. This cache only stores what has been explicitly resolved.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<(EntityId, String), Arc<KindSchema>>,
}

impl SchemaCache {
    /// An empty cache.
    pub fn new() -> Self {
        SchemaCache {
            entries: DashMap::new(),
        }
    }

    /// Register (or replace) the resolved schema for `kind` on `branch`.
    pub fn register(&self, branch: EntityId, schema: KindSchema) -> Arc<KindSchema> {
        let arc = Arc::new(schema);
        self.entries.insert((branch, arc.kind.clone()), arc.clone());
        arc
    }

    /// Fetch the resolved schema for `kind` on `branch`, if cached.
    pub fn get(&self, branch: EntityId, kind: &str) -> Option<Arc<KindSchema>> {
        self.entries.get(&(branch, kind.to_string())).map(|e| e.clone())
    }

    /// Every kind with a resolved schema on `branch`.
    pub fn kinds(&self, branch: EntityId) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.key().0 == branch)
            .map(|e| e.key().1.clone())
            .collect()
    }

    /// Drop every cached entry for `branch`, forcing re-resolution.
    pub fn invalidate_branch(&self, branch: EntityId) {
        self.entries.retain(|(b, _), _| *b != branch);
    }

    /// Check whether `kind`'s schema on `source` is compatible with its
    /// schema on `target`, for the purposes of a merge.
    ///
    /// Compatible means identical by content hash. If either branch has no
    /// resolved schema for `kind`, the check passes vacuously — an
    /// unschematized kind imposes no constraint.
    pub fn check_compatible(
        &self,
        source: EntityId,
        target: EntityId,
        kind: &str,
    ) -> GraphResult<()> {
        let (Some(a), Some(b)) = (self.get(source, kind), self.get(target, kind)) else {
            return Ok(());
        };
        if schema_hash(&a) == schema_hash(&b) {
            return Ok(());
        }
        debug!(kind, "schema hash mismatch during compatibility check");

        for attr_a in &a.attributes {
            if let Some(attr_b) = b.attribute(&attr_a.name) {
                if attr_a.value_kind != attr_b.value_kind {
                    return Err(GraphError::SchemaMismatch {
                        kind: "attribute",
                        name: attr_a.name.clone(),
                        reason: format!(
                            "value kind differs: {} vs {}",
                            attr_a.value_kind, attr_b.value_kind
                        ),
                    });
                }
            }
        }
        for rel_a in &a.relationships {
            if let Some(rel_b) = b.relationship_by_identifier(&rel_a.identifier) {
                if rel_a.peer_kind != rel_b.peer_kind {
                    return Err(GraphError::SchemaMismatch {
                        kind: "relationship",
                        name: rel_a.identifier.clone(),
                        reason: format!(
                            "peer kind differs: {} vs {}",
                            rel_a.peer_kind, rel_b.peer_kind
                        ),
                    });
                }
                if rel_a.cardinality != rel_b.cardinality {
                    return Err(GraphError::SchemaMismatch {
                        kind: "relationship",
                        name: rel_a.identifier.clone(),
                        reason: "cardinality differs".to_string(),
                    });
                }
            }
        }
        Err(GraphError::SchemaConflict(format!(
            "schema for kind '{kind}' diverges between branches"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AttributeDescriptor, Cardinality, RelationshipDescriptor};
    use branchgraph_core::ValueKind;

    fn schema(value_kind: ValueKind) -> KindSchema {
        KindSchema {
            kind: "device".to_string(),
            attributes: vec![AttributeDescriptor {
                name: "hostname".to_string(),
                value_kind,
                optional: false,
                branch_aware: true,
                choices: None,
            }],
            relationships: vec![RelationshipDescriptor {
                identifier: "device__interfaces".to_string(),
                peer_kind: "interface".to_string(),
                cardinality: Cardinality::Many,
                optional: true,
            }],
        }
    }

    #[test]
    fn identical_schemas_are_compatible() {
        let cache = SchemaCache::new();
        let a = EntityId::new();
        let b = EntityId::new();
        cache.register(a, schema(ValueKind::Text));
        cache.register(b, schema(ValueKind::Text));
        assert!(cache.check_compatible(a, b, "device").is_ok());
    }

    #[test]
    fn diverging_value_kind_is_a_mismatch() {
        let cache = SchemaCache::new();
        let a = EntityId::new();
        let b = EntityId::new();
        cache.register(a, schema(ValueKind::Text));
        cache.register(b, schema(ValueKind::Int));
        let err = cache.check_compatible(a, b, "device").unwrap_err();
        assert!(matches!(err, GraphError::SchemaMismatch { .. }));
    }

    #[test]
    fn unschematized_kind_is_vacuously_compatible() {
        let cache = SchemaCache::new();
        let a = EntityId::new();
        let b = EntityId::new();
        assert!(cache.check_compatible(a, b, "device").is_ok());
    }

    #[test]
    fn invalidate_drops_only_that_branch() {
        let cache = SchemaCache::new();
        let a = EntityId::new();
        let b = EntityId::new();
        cache.register(a, schema(ValueKind::Text));
        cache.register(b, schema(ValueKind::Text));
        cache.invalidate_branch(a);
        assert!(cache.get(a, "device").is_none());
        assert!(cache.get(b, "device").is_some());
    }
}
