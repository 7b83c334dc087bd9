//! Per-branch schema descriptors
//!
//! Every node `kind` (e.g. `device`, `interface`) has a schema: the
//! attributes it carries and the relationships it can participate in. A
//! schema is scoped to a branch, since a feature branch may add an
//! attribute before it merges back. The [`SchemaCache`] holds the resolved
//! descriptor for each `(branch, kind)` pair and a content hash used to
//! decide, at merge time, whether two branches' schemas are compatible.

#![warn(missing_docs)]

pub mod cache;
pub mod descriptor;
pub mod hash;

pub use cache::SchemaCache;
pub use descriptor::{AttributeDescriptor, Cardinality, KindSchema, RelationshipDescriptor};
pub use hash::schema_hash;
