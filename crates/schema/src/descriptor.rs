//! Schema descriptor types

use branchgraph_core::ValueKind;
use serde::{Deserialize, Serialize};

/// Whether a relationship connects to at most one peer or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one peer at a time.
    One,
    /// Any number of peers.
    Many,
}

/// The schema for one attribute slot on a kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Attribute name, unique within its kind.
    pub name: String,
    /// The value kind writes to this attribute must match.
    pub value_kind: ValueKind,
    /// Whether the attribute may be absent on an instance of this kind.
    pub optional: bool,
    /// Whether the attribute's value can vary independently on a branch
    /// without the whole node being considered branch-modified.
    pub branch_aware: bool,
    /// If set, a write must match one of these literals exactly.
    pub choices: Option<Vec<branchgraph_core::Value>>,
}

/// The schema for one relationship slot on a kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// Stable identifier shared by both ends of the relationship, e.g.
    /// `device__interfaces`.
    pub identifier: String,
    /// The kind of node on the other end.
    pub peer_kind: String,
    /// How many peers this end may hold.
    pub cardinality: Cardinality,
    /// Whether the relationship may be absent.
    pub optional: bool,
}

/// The full schema for one node kind, scoped to a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSchema {
    /// The kind name, e.g. `device`.
    pub kind: String,
    /// Attribute slots, in declaration order.
    pub attributes: Vec<AttributeDescriptor>,
    /// Relationship slots, in declaration order.
    pub relationships: Vec<RelationshipDescriptor>,
}

impl KindSchema {
    /// An empty schema for `kind` with no attributes or relationships.
    pub fn empty(kind: impl Into<String>) -> Self {
        KindSchema {
            kind: kind.into(),
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Look up an attribute descriptor by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up a relationship descriptor by its shared identifier.
    pub fn relationship_by_identifier(&self, identifier: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.identifier == identifier)
    }
}
