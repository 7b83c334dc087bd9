//! The graph store: vertices, temporal edges, and branch/time-scoped reads
//!
//! The graph is a small, fixed vertex vocabulary — [`VertexKind::Root`],
//! [`VertexKind::Node`], [`VertexKind::Attribute`], [`VertexKind::AttributeValue`],
//! [`VertexKind::Relationship`], [`VertexKind::Boolean`] — connected by
//! [`Edge`]s that each carry a temporal header: the branch they were written
//! on, that branch's level at write time, an active/deleted status, and a
//! `[from, to)` validity interval. An edge is visible to a query against
//! `(query_branch, query_time)` iff its branch is in `query_branch`'s
//! lineage, `from <= query_time`, and `to` is either unset or greater than
//! `query_time`. When more than one edge with the same (source, label,
//! target) shape is visible at once, [`precedence::rank`] picks the winner:
//! higher branch level first, then later `from`, then `deleted` beats
//! `active`.

#![warn(missing_docs)]

pub mod edge;
pub mod precedence;
pub mod store;
pub mod vertex;

pub use edge::{Edge, EdgeLabel, EdgeStatus};
pub use precedence::rank;
pub use store::{GraphStore, InMemoryStore};
pub use vertex::{Vertex, VertexKind};
