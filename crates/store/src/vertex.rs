//! Vertex types

use branchgraph_core::{EntityId, Value};
use serde::{Deserialize, Serialize};

/// The structural role a vertex plays in the graph.
///
/// This is distinct from a node's schema `kind` (e.g. `device`): every
/// `Node` vertex additionally carries a schema kind, but its `VertexKind` is
/// always `Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexKind {
    /// The single anchor vertex a branch's whole graph hangs off of.
    Root,
    /// A schema-typed entity, e.g. a `device` or `interface`.
    Node,
    /// An attribute slot instance on a `Node`.
    Attribute,
    /// The literal value currently (or previously) held by an `Attribute`.
    AttributeValue,
    /// One peer's end of a relationship between two `Node`s.
    Relationship,
    /// A boolean flag vertex, e.g. `is_protected`, `is_visible`.
    Boolean,
}

/// A vertex in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Stable identity.
    pub id: EntityId,
    /// Structural role.
    pub vertex_kind: VertexKind,
    /// Schema kind, populated only for `VertexKind::Node`.
    pub kind: Option<String>,
    /// Slot name: the attribute name for `Attribute`, or the shared
    /// relationship identifier for `Relationship`. Unused otherwise.
    pub name: Option<String>,
    /// Literal payload, populated only for `AttributeValue` and `Boolean`.
    pub value: Option<Value>,
}

impl Vertex {
    /// Construct a `Root` vertex.
    pub fn root(id: EntityId) -> Self {
        Vertex {
            id,
            vertex_kind: VertexKind::Root,
            kind: None,
            name: None,
            value: None,
        }
    }

    /// Construct a `Node` vertex of the given schema kind.
    pub fn node(id: EntityId, kind: impl Into<String>) -> Self {
        Vertex {
            id,
            vertex_kind: VertexKind::Node,
            kind: Some(kind.into()),
            name: None,
            value: None,
        }
    }

    /// Construct an `Attribute` slot vertex named `name`.
    pub fn attribute(id: EntityId, name: impl Into<String>) -> Self {
        Vertex {
            id,
            vertex_kind: VertexKind::Attribute,
            kind: None,
            name: Some(name.into()),
            value: None,
        }
    }

    /// Construct an `AttributeValue` vertex holding `value`.
    pub fn attribute_value(id: EntityId, value: Value) -> Self {
        Vertex {
            id,
            vertex_kind: VertexKind::AttributeValue,
            kind: None,
            name: None,
            value: Some(value),
        }
    }

    /// Construct a `Relationship` peer vertex for the relationship named
    /// `identifier`.
    pub fn relationship(id: EntityId, identifier: impl Into<String>) -> Self {
        Vertex {
            id,
            vertex_kind: VertexKind::Relationship,
            kind: None,
            name: Some(identifier.into()),
            value: None,
        }
    }

    /// Construct a `Boolean` flag vertex.
    pub fn boolean(id: EntityId, value: bool) -> Self {
        Vertex {
            id,
            vertex_kind: VertexKind::Boolean,
            kind: None,
            name: None,
            value: Some(Value::Bool(value)),
        }
    }
}
