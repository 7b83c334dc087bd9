//! # branchgraph
//!
//! A branch-aware, time-travelling property graph: every write is
//! scoped to a branch and a validity window, so a query against
//! `(branch, time)` always resolves the state that was true at that
//! instant, on that branch's lineage, with no copy-on-write storage blowup
//! — branches differ only in which edges out of a shared vertex set are
//! currently visible.
//!
//! # Quick Start
//!
//! ```no_run
//! use branchgraph::{Context, NewBranch, NewNode};
//! use branchgraph_core::{BranchName, Limits, Timestamp, Value, ValueKind};
//! use branchgraph_schema::{AttributeDescriptor, KindSchema};
//! use std::collections::HashMap;
//!
//! # async fn run() -> branchgraph_core::GraphResult<()> {
//! let ctx = Context::new(BranchName::default_branch(), Limits::standard(), 4_096);
//! let main = ctx.branch_query()[0].id;
//!
//! ctx.schema().register(
//!     branchgraph_core::EntityId::from_uuid(main),
//!     KindSchema {
//!         kind: "device".to_string(),
//!         attributes: vec![AttributeDescriptor {
//!             name: "hostname".to_string(),
//!             value_kind: ValueKind::Text,
//!             optional: false,
//!             branch_aware: true,
//!             choices: None,
//!         }],
//!         relationships: vec![],
//!     },
//! );
//!
//! let node = ctx
//!     .node_create(
//!         main,
//!         NewNode {
//!             kind: "device".to_string(),
//!             attributes: HashMap::from([("hostname".to_string(), Value::Text("r1".into()))]),
//!             relationships: HashMap::new(),
//!             attribute_sources: HashMap::new(),
//!             attribute_owners: HashMap::new(),
//!         },
//!         Timestamp::now(),
//!     )
//!     .await?;
//!
//! let branch = ctx.branch_create(NewBranch { name: "feature".to_string(), parent: Some(main), description: None })?;
//! ctx.node_update(branch.id, node, "hostname", Value::Text("r2".into()), Timestamp::now()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # External Interfaces
//!
//! | Operation | Purpose |
//! |---|---|
//! | `BranchCreate`/`Delete`/`Rebase`/`Merge`/`Validate`/`Update`/`Query` | Branch lifecycle |
//! | `NodeCreate`/`Update`/`Delete`/`Get`/`Query` | Per-kind node CRUD |
//! | `RelationshipAdd`/`Remove` | Relationship peer management |
//! | `DiffSummary` | What a branch changed relative to its parent |
//!
//! # Architecture
//!
//! [`Context`] (re-exported from `branchgraph-api`) is the entry point and
//! wires together the graph store, branch registry, schema cache, event
//! emitter, and lock table from the lower crates (`branchgraph-core`,
//! `branchgraph-store`, `branchgraph-registry`, `branchgraph-schema`,
//! `branchgraph-concurrency`, `branchgraph-events`, `branchgraph-engine`).
//! Only the facade surface re-exported here and from `branchgraph-api` is
//! meant to be depended on directly; the lower crates are public for
//! documentation and testing but their internals are not held stable.

pub use branchgraph_api::*;
