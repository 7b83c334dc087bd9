//! Precedence ranking among edges visible at the same query point
//!
//! More than one edge can be visible for the same `(source, label, target)`
//! shape at once — a parent branch's edge and a child branch's override, or
//! two successive updates on the same branch whose windows the caller
//! hasn't pre-filtered. [`rank`] picks the single winner:
//!
//! 1. Higher `branch_level` wins (a more-derived branch overrides its
//!    ancestor).
//! 2. If `branch_level` ties, the later `from` wins (the more recent write
//!    on the same branch overrides an earlier one).
//! 3. If both tie, `status = Deleted` wins over `Active` (an explicit
//!    delete overrides a same-instant write).

use crate::edge::{Edge, EdgeStatus};
use std::cmp::Ordering;

/// Compare two edges for precedence: `Ordering::Greater` means `a` wins over `b`.
pub fn compare(a: &Edge, b: &Edge) -> Ordering {
    a.branch_level
        .cmp(&b.branch_level)
        .then_with(|| a.from.cmp(&b.from))
        .then_with(|| status_rank(a.status).cmp(&status_rank(b.status)))
}

fn status_rank(status: EdgeStatus) -> u8 {
    match status {
        EdgeStatus::Active => 0,
        EdgeStatus::Deleted => 1,
    }
}

/// Pick the winning edge among a set of edges visible at the same query
/// point. Returns `None` if `edges` is empty.
pub fn rank<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Option<&'a Edge> {
    edges.into_iter().max_by(|a, b| compare(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeLabel;
    use branchgraph_core::{EntityId, Timestamp};

    fn edge(branch_level: u32, from: i64, status: EdgeStatus) -> Edge {
        Edge {
            source: EntityId::new(),
            label: EdgeLabel::IsPartOf,
            target: EntityId::new(),
            branch: EntityId::new(),
            branch_level,
            status,
            from: Timestamp::from_micros(from),
            to: None,
        }
    }

    #[test]
    fn higher_branch_level_wins() {
        let low = edge(0, 100, EdgeStatus::Active);
        let high = edge(1, 50, EdgeStatus::Active);
        assert_eq!(compare(&high, &low), Ordering::Greater);
    }

    #[test]
    fn later_from_wins_at_same_level() {
        let earlier = edge(0, 100, EdgeStatus::Active);
        let later = edge(0, 200, EdgeStatus::Active);
        assert_eq!(compare(&later, &earlier), Ordering::Greater);
    }

    #[test]
    fn deleted_wins_ties() {
        let active = edge(0, 100, EdgeStatus::Active);
        let deleted = edge(0, 100, EdgeStatus::Deleted);
        assert_eq!(compare(&deleted, &active), Ordering::Greater);
    }

    #[test]
    fn rank_picks_the_winner() {
        let edges = vec![
            edge(0, 100, EdgeStatus::Active),
            edge(1, 50, EdgeStatus::Active),
            edge(1, 90, EdgeStatus::Active),
        ];
        let winner = rank(edges.iter()).unwrap();
        assert_eq!(winner.branch_level, 1);
        assert_eq!(winner.from, Timestamp::from_micros(90));
    }
}
