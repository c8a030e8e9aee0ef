//! Tree-family policies: Tree, Line, Balanced tree and Depth-limited tree
//!
//! All four share the tree invariant: the head is the only root, there are
//! exactly `n - 1` scoped edges and no directed cycle. The variants add a
//! fan-out bound (Line), a balance bound (Balanced) or a depth bound.

use std::collections::{BTreeMap, BTreeSet};

use mirrorsim_core::{MirrorPayload, NodeId, StructureError, StructureResult, StructureType};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::graph::StructureGraph;
use crate::scope::Scope;
use crate::shape::Shape;

/// Per-member record behind the balance score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    /// Hops from the head
    pub depth: usize,
    /// Scoped children inside the instance
    pub child_count: usize,
    /// `|child_count - target|` for inner members, 0 for leaves
    pub deviation: f64,
}

pub(crate) fn is_valid_tree<M>(scope: &Scope<'_, M>) -> bool {
    let members = scope.members();
    let n = members.len();
    if n == 0 {
        return false;
    }
    if scope.roots() != vec![scope.head()] {
        trace!(head = %scope.head(), "tree must have the head as its only root");
        return false;
    }
    scope.edge_count_within(&members) == n - 1 && !scope.has_cycle()
}

pub(crate) fn is_valid_line<M>(scope: &Scope<'_, M>) -> bool {
    let members = scope.members();
    is_valid_tree(scope)
        && members
            .iter()
            .all(|id| scope.tagged_children(*id).filter(|c| members.contains(c)).count() <= 1)
}

pub(crate) fn is_valid_balanced<M>(scope: &Scope<'_, M>, target: usize, max_deviation: f64) -> bool {
    is_valid_tree(scope) && scope.balance_score(target) <= max_deviation
}

pub(crate) fn is_valid_depth_limited<M>(scope: &Scope<'_, M>, max_depth: usize) -> bool {
    is_valid_tree(scope) && scope.depths().values().all(|depth| *depth < max_depth)
}

pub(crate) fn line_can_grow<M>(scope: &Scope<'_, M>, node: NodeId) -> bool {
    is_valid_line(scope) && scope.child_count(node) == 0
}

pub(crate) fn balanced_can_grow<M>(scope: &Scope<'_, M>, node: NodeId, target: usize) -> bool {
    is_valid_tree(scope) && scope.child_count(node) < target
}

pub(crate) fn depth_limited_can_grow<M>(scope: &Scope<'_, M>, node: NodeId, max_depth: usize) -> bool {
    if !is_valid_tree(scope) {
        return false;
    }
    scope
        .depths()
        .get(&node)
        .is_some_and(|depth| *depth + 1 < max_depth)
}

/// Leaf, not the head, and at least two members stay behind
pub(crate) fn tree_can_shrink<M>(scope: &Scope<'_, M>, node: NodeId) -> bool {
    node != scope.head() && scope.is_leaf(node) && scope.members().len() >= 3
}

/// Balance score of a precomputed info map
///
/// Mean absolute fan-out deviation over inner members, averaged with the
/// mean per-level standard deviation of child counts. Only levels holding
/// at least one inner member count. An instance with no inner member
/// scores 0.
pub fn score_from_info(info: &BTreeMap<NodeId, BalanceInfo>) -> f64 {
    let inner: Vec<&BalanceInfo> = info.values().filter(|i| i.child_count > 0).collect();
    if inner.is_empty() {
        return 0.0;
    }
    let fanout_deviation = inner.iter().map(|i| i.deviation).sum::<f64>() / inner.len() as f64;

    let inner_levels: BTreeSet<usize> = inner.iter().map(|i| i.depth).collect();
    let mut levels: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for record in info.values().filter(|i| inner_levels.contains(&i.depth)) {
        levels
            .entry(record.depth)
            .or_default()
            .push(record.child_count as f64);
    }
    let level_spread = levels
        .values()
        .map(|counts| {
            let mean = counts.iter().sum::<f64>() / counts.len() as f64;
            let variance =
                counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
            variance.sqrt()
        })
        .sum::<f64>()
        / levels.len() as f64;

    (fanout_deviation + level_spread) / 2.0
}

impl<M> Scope<'_, M> {
    /// Depth, fan-out and deviation of every member reachable from the head
    ///
    /// Derived data: recomputed on every call.
    pub fn balance_info(&self, target: usize) -> BTreeMap<NodeId, BalanceInfo> {
        let members = self.members();
        self.depths()
            .into_iter()
            .map(|(id, depth)| {
                let child_count = self.tagged_children(id).filter(|c| members.contains(c)).count();
                let deviation = if child_count > 0 {
                    child_count.abs_diff(target) as f64
                } else {
                    0.0
                };
                (
                    id,
                    BalanceInfo {
                        depth,
                        child_count,
                        deviation,
                    },
                )
            })
            .collect()
    }

    /// Lower is better, 0 is perfect
    pub fn balance_score(&self, target: usize) -> f64 {
        score_from_info(&self.balance_info(target))
    }

    /// Largest member depth
    pub fn tree_height(&self) -> usize {
        self.depths().into_values().max().unwrap_or(0)
    }

    /// `node` plus everything below it through scoped child edges
    pub fn subtree_size(&self, node: NodeId) -> usize {
        let members = self.members();
        if !members.contains(&node) {
            return 0;
        }
        let mut seen = BTreeSet::from([node]);
        let mut worklist = vec![node];
        while let Some(current) = worklist.pop() {
            if current != self.head() && self.is_boundary(current) {
                continue;
            }
            for child in self.tagged_children(current) {
                if members.contains(&child) && seen.insert(child) {
                    worklist.push(child);
                }
            }
        }
        seen.len()
    }
}

impl<M> StructureGraph<M> {
    fn balance_target(&self, ty: StructureType, head: NodeId) -> StructureResult<usize> {
        match self.role(head, ty) {
            Some(Shape::BalancedTree {
                target_links_per_node,
                ..
            }) => Ok(target_links_per_node),
            _ => Err(StructureError::InvalidShapeParameter {
                shape: ty,
                reason: format!("{head} does not hold a balanced tree role"),
            }),
        }
    }

    /// Balance score of the `(ty, head)` balanced tree
    pub fn balance_score(&self, ty: StructureType, head: NodeId) -> StructureResult<f64> {
        let target = self.balance_target(ty, head)?;
        Ok(self.scope(ty, head).balance_score(target))
    }

    /// Balance info map of the `(ty, head)` balanced tree
    pub fn balance_info(
        &self,
        ty: StructureType,
        head: NodeId,
    ) -> StructureResult<BTreeMap<NodeId, BalanceInfo>> {
        let target = self.balance_target(ty, head)?;
        Ok(self.scope(ty, head).balance_info(target))
    }
}

impl<M: MirrorPayload> StructureGraph<M> {
    /// Absolute change of the balance score if `node` left the instance
    ///
    /// Detaches `node` temporarily, re-homing its children to its parent,
    /// and always restores the structure before returning.
    pub fn removal_impact(&mut self, node: NodeId, ty: StructureType, head: NodeId) -> StructureResult<f64> {
        let target = self.balance_target(ty, head)?;
        let before = self.scope(ty, head).balance_score(target);
        let after = self.with_detached(node, ty, head, |graph| {
            let score = graph.scope(ty, head).balance_score(target);
            if score.is_finite() {
                Ok(score)
            } else {
                Err(StructureError::ProbeFailed(format!(
                    "balance score of {ty} instance at {head} is not finite"
                )))
            }
        })?;
        Ok((after - before).abs())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// 1 -> {2, 3}, 2 -> 4, 3 -> 5
    fn tree_graph(shape: Shape) -> StructureGraph {
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=5 {
            graph.insert_node(NodeId(id), shape).unwrap();
        }
        graph.set_head(NodeId(1), shape.structure_type(), true).unwrap();
        for (owner, child) in [(1, 2), (1, 3), (2, 4), (3, 5)] {
            graph.attach_child(NodeId(owner), NodeId(child)).unwrap();
        }
        graph
    }

    #[test]
    fn test_sample_tree_is_valid() {
        let graph = tree_graph(Shape::Tree);
        assert!(graph.is_valid_structure(NodeId(5), StructureType::Tree));
        let scope = graph.scope(StructureType::Tree, NodeId(1));
        assert_eq!(scope.edge_count(), 4);
        assert_eq!(scope.tree_height(), 2);
        assert_eq!(scope.subtree_size(NodeId(2)), 2);
        assert_eq!(scope.subtree_size(NodeId(1)), 5);
    }

    #[test]
    fn test_tree_with_extra_edge_is_invalid() {
        let mut graph = tree_graph(Shape::Tree);
        let heads = BTreeMap::from([(StructureType::Tree, NodeId(1))]);
        graph.add_child(NodeId(4), NodeId(5), &[], &heads).unwrap();
        assert!(!graph.is_valid_instance(StructureType::Tree, NodeId(1)));
    }

    #[test]
    fn test_tree_shrink_policy() {
        let mut graph = tree_graph(Shape::Tree);
        let (ty, head) = (StructureType::Tree, NodeId(1));
        assert!(graph.can_be_removed_from_structure(NodeId(4), ty, head));
        assert!(!graph.can_be_removed_from_structure(NodeId(2), ty, head));
        assert!(!graph.can_be_removed_from_structure(NodeId(1), ty, head));
    }

    #[test]
    fn test_two_node_tree_cannot_shrink() {
        let mut graph: StructureGraph = StructureGraph::new();
        graph.insert_node(NodeId(1), Shape::Tree).unwrap();
        graph.insert_node(NodeId(2), Shape::Tree).unwrap();
        graph.set_head(NodeId(1), StructureType::Tree, true).unwrap();
        graph.attach_child(NodeId(1), NodeId(2)).unwrap();
        assert!(!graph.can_be_removed_from_structure(NodeId(2), StructureType::Tree, NodeId(1)));
    }

    #[test]
    fn test_line_allows_one_child() {
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=3 {
            graph.insert_node(NodeId(id), Shape::Line).unwrap();
        }
        graph.set_head(NodeId(1), StructureType::Line, true).unwrap();
        graph.attach_child(NodeId(1), NodeId(2)).unwrap();
        assert!(graph.is_valid_instance(StructureType::Line, NodeId(1)));
        assert!(!graph.can_accept_more_children(NodeId(1), StructureType::Line));
        assert!(graph.can_accept_more_children(NodeId(2), StructureType::Line));

        graph.attach_child(NodeId(1), NodeId(3)).unwrap();
        assert!(!graph.is_valid_instance(StructureType::Line, NodeId(1)));
    }

    #[test]
    fn test_balance_score_of_perfect_binary_tree() {
        let shape = Shape::balanced_tree(2, 0.5).unwrap();
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=7 {
            graph.insert_node(NodeId(id), shape).unwrap();
        }
        graph.set_head(NodeId(1), StructureType::BalancedTree, true).unwrap();
        for (owner, child) in [(1, 2), (1, 3), (2, 4), (2, 5), (3, 6), (3, 7)] {
            graph.attach_child(NodeId(owner), NodeId(child)).unwrap();
        }
        let score = graph.balance_score(StructureType::BalancedTree, NodeId(1)).unwrap();
        assert_eq!(score, 0.0);
        assert!(graph.is_valid_instance(StructureType::BalancedTree, NodeId(1)));
        assert!(!graph.can_accept_more_children(NodeId(2), StructureType::BalancedTree));
        assert!(graph.can_accept_more_children(NodeId(4), StructureType::BalancedTree));
    }

    #[test]
    fn test_balance_score_of_sample_tree() {
        // Inner: 1 (2 children), 2 (1), 3 (1); target 2
        // fan-out deviation = (0 + 1 + 1) / 3
        // levels 0: [2] -> 0, level 1: [1, 1] -> 0
        let graph = tree_graph(Shape::balanced_tree(2, 1.0).unwrap());
        let score = graph.balance_score(StructureType::BalancedTree, NodeId(1)).unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
        let info = graph.balance_info(StructureType::BalancedTree, NodeId(1)).unwrap();
        assert_eq!(score_from_info(&info), score);
        assert_eq!(info[&NodeId(5)].depth, 2);
        assert_eq!(info[&NodeId(5)].deviation, 0.0);
    }

    #[test]
    fn test_balance_score_requires_balanced_role() {
        let graph = tree_graph(Shape::Tree);
        assert!(graph.balance_score(StructureType::Tree, NodeId(1)).is_err());
    }

    #[test]
    fn test_removal_impact_bounds_shrink() {
        let mut strict = tree_graph(Shape::balanced_tree(2, 0.01).unwrap());
        let (ty, head) = (StructureType::BalancedTree, NodeId(1));
        let before = strict.all_nodes_in_structure(ty, head);

        // Removing 5 leaves 3 childless: inner becomes 1 (2) and 2 (1),
        // level 1 counts [1, 0] -> spread 0.5
        let impact = strict.removal_impact(NodeId(5), ty, head).unwrap();
        let expected_after = (0.5 + (0.0 + 0.5) / 2.0) / 2.0;
        assert!((impact - (expected_after - 1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(strict.all_nodes_in_structure(ty, head), before);
        assert!(!strict.can_be_removed_from_structure(NodeId(5), ty, head));

        let mut loose = tree_graph(Shape::balanced_tree(2, 0.5).unwrap());
        assert!(loose.can_be_removed_from_structure(NodeId(5), ty, head));
        assert_eq!(loose.all_nodes_in_structure(ty, head), before);
    }

    #[test]
    fn test_depth_limited_policies() {
        let graph = tree_graph(Shape::depth_limited_tree(3).unwrap());
        let ty = StructureType::DepthLimitedTree;
        assert!(graph.is_valid_instance(ty, NodeId(1)));
        assert!(graph.can_accept_more_children(NodeId(2), ty));
        assert!(!graph.can_accept_more_children(NodeId(4), ty));

        let shallow = tree_graph(Shape::depth_limited_tree(2).unwrap());
        assert!(!shallow.is_valid_instance(ty, NodeId(1)));
    }
}
