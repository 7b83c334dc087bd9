//! Wiring the lower-level crates into one set of collaborators
//!
//! Every facade method in [`crate::facade`] is a method on [`Context`]
//! rather than a free function taking a pile of `Arc`s, so a transport
//! adapter only ever needs to hold one value.

use branchgraph_concurrency::BranchLocks;
use branchgraph_core::{BranchName, Config, EntityId, GraphResult, Limits};
use branchgraph_engine::{DiffEngine, MergeEngine, NodeManager, QueryLayer};
use branchgraph_events::EventEmitter;
use branchgraph_registry::BranchRegistry;
use branchgraph_schema::SchemaCache;
use branchgraph_store::{GraphStore, InMemoryStore};
use std::sync::Arc;

/// The engine, fully wired: one graph store, one branch registry, one
/// schema cache, one event emitter, one lock table, and the four
/// operation-bearing collaborators built on top of them, all sharing the
/// same `Root` vertex.
pub struct Context {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) registry: Arc<BranchRegistry>,
    pub(crate) schema: Arc<SchemaCache>,
    pub(crate) events: Arc<EventEmitter>,
    pub(crate) locks: Arc<BranchLocks>,
    pub(crate) nodes: NodeManager,
    pub(crate) query: QueryLayer,
    pub(crate) diff: DiffEngine,
    pub(crate) merge: MergeEngine,
    pub(crate) root_vertex: EntityId,
}

impl Context {
    /// Build a context over a fresh in-memory store, a registry with a
    /// single default branch, and an event queue of `event_queue_capacity`.
    pub fn new(default_branch: BranchName, limits: Limits, event_queue_capacity: usize) -> Self {
        let store: Arc<dyn GraphStore> = Arc::new(InMemoryStore::new());
        let registry = Arc::new(BranchRegistry::new(default_branch, limits));
        let schema = Arc::new(SchemaCache::new());
        let events = Arc::new(EventEmitter::new(event_queue_capacity));
        let locks = Arc::new(BranchLocks::new());

        let nodes = NodeManager::new(store.clone(), registry.clone(), schema.clone(), events.clone(), locks.clone());
        let root_vertex = nodes.root_vertex();
        let query = QueryLayer::new(store.clone(), registry.clone(), root_vertex);
        let diff = DiffEngine::new(store.clone(), registry.clone(), root_vertex);
        let merge = MergeEngine::new(store.clone(), registry.clone(), schema.clone(), events.clone(), locks.clone(), root_vertex);

        Context {
            store,
            registry,
            schema,
            events,
            locks,
            nodes,
            query,
            diff,
            merge,
            root_vertex,
        }
    }

    /// Build a context from environment-sourced configuration, using
    /// `main` as the default branch and production-sized [`Limits`] beyond
    /// what `config` overrides.
    pub fn from_config(config: &Config) -> GraphResult<Self> {
        let mut limits = Limits::standard();
        limits.event_queue_capacity = config.event_queue_capacity;
        Ok(Context::new(
            BranchName::default_branch(),
            limits,
            config.event_queue_capacity,
        ))
    }

    /// The schema cache, for callers that need to register kinds before
    /// any node of that kind can be created.
    pub fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    /// The event emitter, for callers that want to drain or subscribe to
    /// the write-behind queue.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// The id of the graph's single shared `Root` vertex.
    pub fn root_vertex(&self) -> EntityId {
        self.root_vertex
    }
}
