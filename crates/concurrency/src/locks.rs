//! Per-branch write serialization
//!
//! A single [`DashMap`] from branch id to an `Arc<tokio::sync::Mutex<()>>`
//! gives every branch its own write lock, created lazily on first use. Two
//! writers targeting different branches never contend; two writers
//! targeting the same branch queue behind each other. Readers never take
//! this lock at all — the store's snapshot reads are lock-free.

use branchgraph_core::EntityId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// The set of per-branch write locks for a single engine instance.
#[derive(Debug, Default)]
pub struct BranchLocks {
    locks: DashMap<EntityId, Arc<Mutex<()>>>,
}

impl BranchLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        BranchLocks {
            locks: DashMap::new(),
        }
    }

    /// Acquire the write lock for `branch`, creating its entry if absent.
    ///
    /// The returned guard owns a clone of the branch's `Arc<Mutex<()>>`, not
    /// a borrow into this table, so it can be held across `.await` points
    /// without holding a `DashMap` shard lock.
    pub async fn acquire(&self, branch: EntityId) -> WriteGuard {
        let mutex = self
            .locks
            .entry(branch)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        WriteGuard { guard }
    }

    /// Drop the lock entry for a branch that has been deleted.
    ///
    /// Safe to call even while a guard for `branch` is outstanding: the
    /// guard holds its own `Arc` clone, so the mutex stays alive until the
    /// guard drops.
    pub fn forget(&self, branch: EntityId) {
        self.locks.remove(&branch);
    }
}

/// RAII guard holding a branch's write lock.
///
/// Dropping the guard releases the lock, unblocking the next queued writer
/// for the same branch.
pub struct WriteGuard {
    // Held purely for its `Drop` side effect; never read.
    #[allow(dead_code)]
    guard: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for WriteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGuard").finish_non_exhaustive()
    }
}
