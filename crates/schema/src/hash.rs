//! Content hashing for schema-compatibility checks
//!
//! The merge engine needs to know, cheaply, whether two branches' schemas
//! for the same kind are identical without diffing every field by hand. We
//! hash a canonical (sorted, whitespace-free) rendering of the schema with
//! `xxh3` and compare hashes; a mismatch triggers the full structural
//! comparison that produces a `SchemaMismatch` error with detail.

use crate::descriptor::{Cardinality, KindSchema};
use std::fmt::Write as _;
use xxhash_rust::xxh3::xxh3_64;

/// Compute a content hash for `schema`.
///
/// Attributes and relationships are sorted by name/identifier before
/// hashing so that declaration order — which carries no semantic meaning —
/// doesn't change the hash.
pub fn schema_hash(schema: &KindSchema) -> u64 {
    let mut canonical = String::new();
    let _ = write!(canonical, "kind={}", schema.kind);

    let mut attrs: Vec<_> = schema.attributes.iter().collect();
    attrs.sort_by(|a, b| a.name.cmp(&b.name));
    for a in attrs {
        let _ = write!(
            canonical,
            "|attr:{}:{}:{}:{}",
            a.name, a.value_kind, a.optional, a.branch_aware
        );
    }

    let mut rels: Vec<_> = schema.relationships.iter().collect();
    rels.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    for r in rels {
        let card = match r.cardinality {
            Cardinality::One => "one",
            Cardinality::Many => "many",
        };
        let _ = write!(
            canonical,
            "|rel:{}:{}:{}:{}",
            r.identifier, r.peer_kind, card, r.optional
        );
    }

    xxh3_64(canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AttributeDescriptor, RelationshipDescriptor};
    use branchgraph_core::ValueKind;

    fn sample() -> KindSchema {
        KindSchema {
            kind: "device".to_string(),
            attributes: vec![AttributeDescriptor {
                name: "hostname".to_string(),
                value_kind: ValueKind::Text,
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
    fn identical_schemas_hash_equal() {
        assert_eq!(schema_hash(&sample()), schema_hash(&sample()));
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let mut reordered = sample();
        reordered.attributes.push(AttributeDescriptor {
            name: "asset_tag".to_string(),
            value_kind: ValueKind::Text,
            optional: true,
            branch_aware: false,
            choices: None,
        });
        reordered.attributes.reverse();
        let mut original = sample();
        original.attributes.push(AttributeDescriptor {
            name: "asset_tag".to_string(),
            value_kind: ValueKind::Text,
            optional: true,
            branch_aware: false,
            choices: None,
        });
        assert_eq!(schema_hash(&reordered), schema_hash(&original));
    }

    #[test]
    fn changing_a_field_changes_the_hash() {
        let mut changed = sample();
        changed.attributes[0].optional = true;
        assert_ne!(schema_hash(&sample()), schema_hash(&changed));
    }
}
