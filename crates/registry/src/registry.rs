//! The registry itself: create/get/list/rebase/delete over a branch tree

use crate::branch::{BranchRecord, BranchStatus};
use crate::lineage::Lineage;
use branchgraph_core::{
    BranchName, ConstraintReason, EntityId, ErrorDetails, GraphError, GraphResult, Limits,
    Timestamp,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Namespace used to derive the default branch's id deterministically, so
/// every fresh registry agrees on its identity without coordination.
const DEFAULT_BRANCH_NAMESPACE: Uuid = Uuid::from_bytes([
    0x7a, 0x1f, 0x2e, 0xb0, 0x9c, 0x44, 0x4b, 0x1d, 0x9a, 0x7e, 0x3d, 0x0a, 0x5e, 0x61, 0xf2, 0x08,
]);

/// The branch registry: tracks identity, parentage, and lifecycle for every
/// branch, and answers lineage queries.
///
/// Reads clone the current [`Lineage`] snapshot `Arc` and never block.
/// Writes (`create`, `rebase`, `delete`) serialize behind a single mutex,
/// build the next snapshot from the current one, and swap it in — so a
/// concurrent reader sees either the old tree or the new one, never a
/// partially-updated one.
pub struct BranchRegistry {
    writer: Mutex<()>,
    snapshot: RwLock<Arc<Lineage>>,
    limits: Limits,
}

impl BranchRegistry {
    /// Create a registry with a single root branch named `default_name`.
    pub fn new(default_name: BranchName, limits: Limits) -> Self {
        let id = EntityId::from_uuid(Uuid::new_v5(
            &DEFAULT_BRANCH_NAMESPACE,
            default_name.as_str().as_bytes(),
        ));
        let root = BranchRecord::root(default_name, id, Timestamp::now());
        let mut records = FxHashMap::default();
        records.insert(id, root);
        BranchRegistry {
            writer: Mutex::new(()),
            snapshot: RwLock::new(Arc::new(Lineage::new(records))),
            limits,
        }
    }

    /// The id of this registry's root branch.
    pub fn root_id(&self) -> EntityId {
        self.snapshot
            .read()
            .all()
            .find(|r| r.parent.is_none())
            .map(|r| r.id)
            .expect("registry always has a root")
    }

    /// A lock-free snapshot of the current branch tree.
    pub fn lineage(&self) -> Arc<Lineage> {
        self.snapshot.read().clone()
    }

    /// Fetch a branch by id.
    pub fn get(&self, id: EntityId) -> GraphResult<BranchRecord> {
        self.lineage()
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::branch_not_found(id.to_string()))
    }

    /// Fetch a branch by name among active branches.
    pub fn get_by_name(&self, name: &str) -> GraphResult<BranchRecord> {
        self.lineage()
            .all()
            .find(|r| r.is_active() && r.name.as_str() == name)
            .cloned()
            .ok_or_else(|| GraphError::branch_not_found(name))
    }

    /// List every active branch.
    pub fn list(&self) -> Vec<BranchRecord> {
        self.lineage()
            .all()
            .filter(|r| r.is_active())
            .cloned()
            .collect()
    }

    /// Create a new branch forked from `parent`.
    pub fn create(&self, name: BranchName, parent: EntityId) -> GraphResult<BranchRecord> {
        let _guard = self.writer.lock();
        let current = self.snapshot.read().clone();

        if current.all().any(|r| r.name.as_str() == name.as_str()) {
            return Err(GraphError::BranchExists {
                name: name.as_str().to_string(),
            });
        }
        if current.all().filter(|r| r.is_active()).count() >= self.limits.max_branches {
            return Err(GraphError::Validation(ErrorDetails::new(
                "branch",
                ConstraintReason::Other("branch limit reached".to_string()),
            )));
        }
        let parent_record = current
            .get(parent)
            .ok_or_else(|| GraphError::branch_not_found(parent.to_string()))?;
        if !parent_record.is_active() {
            return Err(GraphError::Validation(ErrorDetails::new(
                "parent",
                ConstraintReason::Other("cannot fork from a deleted branch".to_string()),
            )));
        }

        let created_at = Timestamp::now();
        let record = BranchRecord {
            id: EntityId::new(),
            name,
            parent: Some(parent),
            branch_level: parent_record.branch_level + 1,
            created_at,
            branched_from: created_at,
            status: BranchStatus::Active,
            description: None,
        };

        let mut records: FxHashMap<EntityId, BranchRecord> =
            current.all().map(|r| (r.id, r.clone())).collect();
        records.insert(record.id, record.clone());
        *self.snapshot.write() = Arc::new(Lineage::new(records));

        info!(branch = %record.name, id = %record.id, parent = %parent, "branch created");
        Ok(record)
    }

    /// Update a branch's free-form description (`BranchUpdate` in the
    /// facade contract).
    pub fn update_description(&self, branch: EntityId, description: Option<String>) -> GraphResult<BranchRecord> {
        let _guard = self.writer.lock();
        let current = self.snapshot.read().clone();
        current
            .get(branch)
            .ok_or_else(|| GraphError::branch_not_found(branch.to_string()))?;

        let mut records: FxHashMap<EntityId, BranchRecord> =
            current.all().map(|r| (r.id, r.clone())).collect();
        if let Some(r) = records.get_mut(&branch) {
            r.description = description;
        }
        *self.snapshot.write() = Arc::new(Lineage::new(records));
        self.get(branch)
    }

    /// Re-parent `branch` onto `new_parent`.
    ///
    /// Rejects rebasing the root branch, rebasing onto a descendant of
    /// `branch` (which would create a cycle), and rebasing onto itself.
    /// Cascades the `branch_level` update to every descendant.
    pub fn rebase(&self, branch: EntityId, new_parent: EntityId) -> GraphResult<BranchRecord> {
        let _guard = self.writer.lock();
        let current = self.snapshot.read().clone();

        let record = current
            .get(branch)
            .ok_or_else(|| GraphError::branch_not_found(branch.to_string()))?
            .clone();
        if record.parent.is_none() {
            return Err(GraphError::Validation(ErrorDetails::new(
                "branch",
                ConstraintReason::Other("cannot rebase the root branch".to_string()),
            )));
        }
        if branch == new_parent || current.is_descendant(new_parent, branch) {
            return Err(GraphError::Validation(ErrorDetails::new(
                "new_parent",
                ConstraintReason::Other("rebase would create a cycle".to_string()),
            )));
        }
        let new_parent_record = current
            .get(new_parent)
            .ok_or_else(|| GraphError::branch_not_found(new_parent.to_string()))?
            .clone();

        let mut records: FxHashMap<EntityId, BranchRecord> =
            current.all().map(|r| (r.id, r.clone())).collect();

        let base_level = new_parent_record.branch_level + 1;
        let level_delta = base_level as i64 - record.branch_level as i64;
        let rebased_at = Timestamp::now();

        if let Some(r) = records.get_mut(&branch) {
            r.parent = Some(new_parent);
            r.branch_level = base_level;
            r.branched_from = rebased_at;
        }
        for descendant in current.descendants(branch) {
            if let Some(r) = records.get_mut(&descendant) {
                r.branch_level = (r.branch_level as i64 + level_delta).max(0) as u32;
            }
        }

        *self.snapshot.write() = Arc::new(Lineage::new(records));
        debug!(%branch, %new_parent, "branch rebased");
        self.get(branch)
    }

    /// Soft-delete a branch: it stops accepting reads and writes as a live
    /// target, but its history remains in the lineage tree for branches
    /// that were forked from it.
    pub fn delete(&self, branch: EntityId) -> GraphResult<()> {
        let _guard = self.writer.lock();
        let current = self.snapshot.read().clone();

        let record = current
            .get(branch)
            .ok_or_else(|| GraphError::branch_not_found(branch.to_string()))?;
        if record.parent.is_none() {
            return Err(GraphError::Validation(ErrorDetails::new(
                "branch",
                ConstraintReason::Other("cannot delete the root branch".to_string()),
            )));
        }

        let mut records: FxHashMap<EntityId, BranchRecord> =
            current.all().map(|r| (r.id, r.clone())).collect();
        if let Some(r) = records.get_mut(&branch) {
            r.status = BranchStatus::Deleted;
        }
        *self.snapshot.write() = Arc::new(Lineage::new(records));
        info!(%branch, "branch deleted");
        Ok(())
    }
}
