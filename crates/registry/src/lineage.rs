//! Lineage queries over a point-in-time snapshot of the branch tree

use crate::branch::BranchRecord;
use branchgraph_core::EntityId;
use rustc_hash::FxHashMap;

/// An immutable snapshot of the branch tree, used to answer lineage
/// questions without taking any lock.
#[derive(Debug, Clone, Default)]
pub struct Lineage {
    records: FxHashMap<EntityId, BranchRecord>,
}

impl Lineage {
    /// Build a lineage snapshot from a set of records.
    pub fn new(records: FxHashMap<EntityId, BranchRecord>) -> Self {
        Lineage { records }
    }

    /// Look up a branch record by id.
    pub fn get(&self, id: EntityId) -> Option<&BranchRecord> {
        self.records.get(&id)
    }

    /// All branch records, including deleted ones.
    pub fn all(&self) -> impl Iterator<Item = &BranchRecord> {
        self.records.values()
    }

    /// The ordered chain from `branch` up to (and including) the root,
    /// nearest-first. Returns an empty vec if `branch` is unknown.
    ///
    /// This is the `lineage(q_branch)` set used to decide whether an edge
    /// written on some branch is visible from a query issued against
    /// `branch`: the edge is visible only if its branch appears in this
    /// chain.
    pub fn chain(&self, branch: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut current = Some(branch);
        while let Some(id) = current {
            if !self.records.contains_key(&id) {
                break;
            }
            chain.push(id);
            current = self.records.get(&id).and_then(|r| r.parent);
        }
        chain
    }

    /// Whether `ancestor` appears in `branch`'s lineage chain (including
    /// `branch == ancestor`).
    pub fn is_descendant(&self, branch: EntityId, ancestor: EntityId) -> bool {
        self.chain(branch).contains(&ancestor)
    }

    /// Direct children of `branch`.
    pub fn children(&self, branch: EntityId) -> Vec<EntityId> {
        self.records
            .values()
            .filter(|r| r.parent == Some(branch))
            .map(|r| r.id)
            .collect()
    }

    /// All descendants of `branch` (children, grandchildren, ...),
    /// breadth-first, not including `branch` itself.
    pub fn descendants(&self, branch: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut frontier = vec![branch];
        while let Some(id) = frontier.pop() {
            for child in self.children(id) {
                out.push(child);
                frontier.push(child);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branchgraph_core::{BranchName, Timestamp};

    fn record(id: EntityId, parent: Option<EntityId>, level: u32) -> BranchRecord {
        let created_at = Timestamp::now();
        BranchRecord {
            id,
            name: BranchName::new_unchecked(format!("b{id}")),
            parent,
            branch_level: level,
            created_at,
            branched_from: created_at,
            status: crate::branch::BranchStatus::Active,
            description: None,
        }
    }

    #[test]
    fn chain_walks_to_root() {
        let root = EntityId::new();
        let child = EntityId::new();
        let grandchild = EntityId::new();
        let mut map = FxHashMap::default();
        map.insert(root, record(root, None, 0));
        map.insert(child, record(child, Some(root), 1));
        map.insert(grandchild, record(grandchild, Some(child), 2));
        let lineage = Lineage::new(map);

        let chain = lineage.chain(grandchild);
        assert_eq!(chain, vec![grandchild, child, root]);
        assert!(lineage.is_descendant(grandchild, root));
        assert!(!lineage.is_descendant(root, grandchild));
    }

    #[test]
    fn descendants_are_transitive() {
        let root = EntityId::new();
        let child = EntityId::new();
        let grandchild = EntityId::new();
        let mut map = FxHashMap::default();
        map.insert(root, record(root, None, 0));
        map.insert(child, record(child, Some(root), 1));
        map.insert(grandchild, record(grandchild, Some(child), 2));
        let lineage = Lineage::new(map);

        let mut descendants = lineage.descendants(root);
        descendants.sort();
        let mut expected = vec![child, grandchild];
        expected.sort();
        assert_eq!(descendants, expected);
    }
}
