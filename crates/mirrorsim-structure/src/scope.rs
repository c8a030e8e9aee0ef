//! Head-scoped views over one structure instance
//!
//! A [`Scope`] pins a `(type, head)` pair. Everything it reports follows
//! only edges tagged with exactly that pair, in both directions. A node that
//! heads a *different* instance of the same type is a boundary: it belongs
//! to the scope but traversal does not continue past it.
//!
//! All walks use explicit worklists, never native recursion.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use mirrorsim_core::{NodeId, StructureType};
use tracing::trace;

use crate::graph::StructureGraph;
use crate::shape::Shape;

/// Borrowed view of the `(ty, head)` structure instance
#[derive(Debug)]
pub struct Scope<'g, M> {
    pub(crate) graph: &'g StructureGraph<M>,
    ty: StructureType,
    head: NodeId,
}

// Manual impls: a derive would demand `M: Clone`.
impl<M> Clone for Scope<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Scope<'_, M> {}

impl<M> StructureGraph<M> {
    /// View of the structure instance `(ty, head)`
    pub fn scope(&self, ty: StructureType, head: NodeId) -> Scope<'_, M> {
        Scope {
            graph: self,
            ty,
            head,
        }
    }

    /// Every node reachable through edges tagged `(ty, head)`
    pub fn all_nodes_in_structure(&self, ty: StructureType, head: NodeId) -> BTreeSet<NodeId> {
        self.scope(ty, head).members()
    }
}

impl<'g, M> Scope<'g, M> {
    pub fn structure_type(&self) -> StructureType {
        self.ty
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn graph(&self) -> &'g StructureGraph<M> {
        self.graph
    }

    /// Shape the head declares for this type
    pub fn head_shape(&self) -> Option<Shape> {
        self.graph.role(self.head, self.ty)
    }

    /// Heads another instance of the same type
    pub fn is_boundary(&self, id: NodeId) -> bool {
        id != self.head && self.graph.is_head(id, self.ty)
    }

    /// Children reached through `(ty, head)` edges
    pub fn tagged_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + 'g {
        let (ty, head) = (self.ty, self.head);
        self.graph
            .node(id)
            .into_iter()
            .flat_map(|node| node.children())
            .filter(move |edge| edge.is_tagged(ty, head))
            .map(|edge| edge.child())
    }

    /// Owners whose `(ty, head)` edge points at `id`
    pub fn tagged_parents(&self, id: NodeId) -> impl Iterator<Item = NodeId> + 'g {
        let (ty, head) = (self.ty, self.head);
        let graph = self.graph;
        graph.incoming(id).filter(move |owner| {
            graph
                .node(*owner)
                .and_then(|node| node.edge_to(id))
                .map(|edge| edge.is_tagged(ty, head))
                .unwrap_or(false)
        })
    }

    /// Members of this instance, found by worklist from the head
    pub fn members(&self) -> BTreeSet<NodeId> {
        self.members_from(self.head)
    }

    /// Members reachable from `start` without crossing a boundary head
    pub fn members_from(&self, start: NodeId) -> BTreeSet<NodeId> {
        let mut visited = BTreeSet::new();
        if !self.graph.contains(start) {
            return visited;
        }
        let mut worklist = vec![start];
        visited.insert(start);

        while let Some(current) = worklist.pop() {
            if current != start && self.is_boundary(current) {
                trace!(node = %current, ty = %self.ty, "boundary head, not expanded");
                continue;
            }
            for next in self.tagged_children(current).chain(self.tagged_parents(current)) {
                if visited.insert(next) {
                    worklist.push(next);
                }
            }
        }
        visited
    }

    /// Distinct neighbours of `id` among `members`, in either direction
    pub fn neighbors_within(&self, id: NodeId, members: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
        self.tagged_children(id)
            .chain(self.tagged_parents(id))
            .filter(|n| members.contains(n))
            .collect()
    }

    /// Distinct scoped neighbours of `id`
    pub fn neighbors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.neighbors_within(id, &self.members())
    }

    /// Number of distinct scoped neighbours
    pub fn degree(&self, id: NodeId) -> usize {
        self.neighbors(id).len()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.tagged_children(id).count()
    }

    /// Directed `(ty, head)` edges with both ends inside the instance
    pub fn edge_count(&self) -> usize {
        let members = self.members();
        self.edge_count_within(&members)
    }

    pub(crate) fn edge_count_within(&self, members: &BTreeSet<NodeId>) -> usize {
        members
            .iter()
            .map(|id| self.tagged_children(*id).filter(|c| members.contains(c)).count())
            .sum()
    }

    /// Distinct unordered neighbour pairs inside the instance
    pub fn undirected_edge_count(&self) -> usize {
        let members = self.members();
        members
            .iter()
            .map(|id| {
                self.neighbors_within(*id, &members)
                    .into_iter()
                    .filter(|n| n > id)
                    .count()
            })
            .sum()
    }

    /// No scoped children
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.graph.contains(id) && self.child_count(id) == 0
    }

    /// Exactly one structural connection
    pub fn is_terminal(&self, id: NodeId) -> bool {
        self.degree(id) == 1
    }

    /// The head, with no in-scope parent
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.head
            && self.graph.is_head(id, self.ty)
            && self.tagged_parents(id).next().is_none()
    }

    /// Members without an in-scope parent
    pub fn roots(&self) -> Vec<NodeId> {
        let members = self.members();
        members
            .iter()
            .copied()
            .filter(|id| !self.tagged_parents(*id).any(|p| members.contains(&p)))
            .collect()
    }

    /// Whether the directed `(ty, head)` edges contain a cycle
    ///
    /// Iterative depth-first search with an explicit path stack: reaching a
    /// node that is still open on the current path is a back edge.
    pub fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Open,
            Done,
        }

        let members = self.members();
        let mut marks: BTreeMap<NodeId, Mark> = BTreeMap::new();

        for &root in &members {
            if marks.contains_key(&root) {
                continue;
            }
            marks.insert(root, Mark::Open);
            let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> =
                vec![(root, self.expandable_children(root, &members), 0)];

            while let Some((node, children, index)) = stack.last_mut() {
                if *index < children.len() {
                    let next = children[*index];
                    *index += 1;
                    match marks.get(&next) {
                        Some(Mark::Open) => {
                            trace!(from = %node, to = %next, "back edge found");
                            return true;
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(next, Mark::Open);
                            let next_children = self.expandable_children(next, &members);
                            stack.push((next, next_children, 0));
                        }
                    }
                } else {
                    marks.insert(*node, Mark::Done);
                    stack.pop();
                }
            }
        }
        false
    }

    fn expandable_children(&self, id: NodeId, members: &BTreeSet<NodeId>) -> Vec<NodeId> {
        if self.is_boundary(id) {
            return Vec::new();
        }
        self.tagged_children(id).filter(|c| members.contains(c)).collect()
    }

    /// Whether `set` forms exactly one closed cycle
    ///
    /// True iff every node has exactly one scoped child, that child is in
    /// the set, and following children from any node visits every node
    /// once before returning to it.
    pub fn forms_closed_cycle(&self, set: &BTreeSet<NodeId>) -> bool {
        let Some(&start) = set.iter().next() else {
            return false;
        };
        let mut successor = BTreeMap::new();
        for &id in set {
            let children: Vec<NodeId> = self.tagged_children(id).collect();
            match children.as_slice() {
                [only] if set.contains(only) => {
                    successor.insert(id, *only);
                }
                _ => return false,
            }
        }

        let mut seen = BTreeSet::new();
        let mut current = start;
        for _ in 0..set.len() {
            if !seen.insert(current) {
                return false;
            }
            current = successor[&current];
        }
        current == start && seen.len() == set.len()
    }

    /// Whether `subset` is one connected component under scoped adjacency
    pub fn is_connected_within(&self, subset: &BTreeSet<NodeId>) -> bool {
        let Some(&start) = subset.iter().next() else {
            return true;
        };
        let mut reached = BTreeSet::new();
        reached.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in self.neighbors_within(current, subset) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        reached.len() == subset.len()
    }

    /// Whether following parent links from any member never loops
    pub fn parent_chains_acyclic(&self) -> bool {
        let members = self.members();
        let mut cleared: BTreeSet<NodeId> = BTreeSet::new();
        for &id in &members {
            let mut path = BTreeSet::new();
            let mut current = Some(id);
            while let Some(node_id) = current {
                if cleared.contains(&node_id) || !members.contains(&node_id) {
                    break;
                }
                if !path.insert(node_id) {
                    return false;
                }
                current = self.graph.parent(node_id);
            }
            cleared.extend(path);
        }
        true
    }

    /// Hop distance of every reachable member from the head
    pub fn depths(&self) -> BTreeMap<NodeId, usize> {
        let members = self.members();
        let mut depths = BTreeMap::new();
        if !members.contains(&self.head) {
            return depths;
        }
        depths.insert(self.head, 0);
        let mut queue = VecDeque::from([self.head]);
        while let Some(current) = queue.pop_front() {
            if self.is_boundary(current) {
                continue;
            }
            let depth = depths[&current];
            for next in self.neighbors_within(current, &members) {
                if !depths.contains_key(&next) {
                    depths.insert(next, depth + 1);
                    queue.push_back(next);
                }
            }
        }
        depths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    fn heads(ty: StructureType, head: u32) -> BTreeMap<StructureType, NodeId> {
        BTreeMap::from([(ty, NodeId(head))])
    }

    /// 1 -> {2, 3}, 2 -> 4, 3 -> 5
    fn sample_tree() -> StructureGraph {
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=5 {
            graph.insert_node(NodeId(id), Shape::Tree).unwrap();
        }
        graph.set_head(NodeId(1), StructureType::Tree, true).unwrap();
        for (owner, child) in [(1, 2), (1, 3), (2, 4), (3, 5)] {
            graph.attach_child(NodeId(owner), NodeId(child)).unwrap();
        }
        graph
    }

    fn ring(ids: &[u32]) -> StructureGraph {
        let mut graph: StructureGraph = StructureGraph::new();
        for id in ids {
            graph.insert_node(NodeId(*id), Shape::Ring).unwrap();
        }
        let head = ids[0];
        graph.set_head(NodeId(head), StructureType::Ring, true).unwrap();
        for i in 0..ids.len() {
            let next = ids[(i + 1) % ids.len()];
            graph
                .add_child(NodeId(ids[i]), NodeId(next), &[], &heads(StructureType::Ring, head))
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_members_of_tree() {
        let graph = sample_tree();
        let scope = graph.scope(StructureType::Tree, NodeId(1));
        let members = scope.members();
        assert_eq!(members.len(), 5);
        assert_eq!(scope.edge_count(), 4);
        assert_eq!(scope.roots(), vec![NodeId(1)]);
        assert!(scope.is_root(NodeId(1)));
        assert!(!scope.is_root(NodeId(2)));
        assert!(scope.is_leaf(NodeId(4)));
        assert!(scope.is_terminal(NodeId(5)));
        assert!(!scope.is_terminal(NodeId(3)));
        assert!(!scope.has_cycle());
    }

    #[test]
    fn test_members_reachable_from_any_member() {
        let graph = sample_tree();
        let scope = graph.scope(StructureType::Tree, NodeId(1));
        assert_eq!(scope.members_from(NodeId(5)), scope.members());
    }

    #[test]
    fn test_unknown_head_is_empty() {
        let graph = sample_tree();
        assert!(graph.all_nodes_in_structure(StructureType::Tree, NodeId(42)).is_empty());
    }

    #[test]
    fn test_boundary_head_is_included_but_not_expanded() {
        let mut graph = sample_tree();
        // 5 heads a nested tree: 5 -> 6 tagged (Tree, 5)
        graph.insert_node(NodeId(6), Shape::Tree).unwrap();
        graph.set_head(NodeId(5), StructureType::Tree, true).unwrap();
        graph.attach_child(NodeId(5), NodeId(6)).unwrap();
        // A stray (Tree, 1) edge out of the nested head must not be followed
        graph.insert_node(NodeId(7), Shape::Tree).unwrap();
        graph
            .add_child(NodeId(5), NodeId(7), &[], &heads(StructureType::Tree, 1))
            .unwrap();

        let outer = graph.all_nodes_in_structure(StructureType::Tree, NodeId(1));
        assert!(outer.contains(&NodeId(5)));
        assert!(!outer.contains(&NodeId(6)));
        assert!(!outer.contains(&NodeId(7)));

        let inner = graph.all_nodes_in_structure(StructureType::Tree, NodeId(5));
        assert_eq!(inner, BTreeSet::from([NodeId(5), NodeId(6)]));
    }

    #[test]
    fn test_ring_cycle_detection() {
        let graph = ring(&[1, 2, 3]);
        let scope = graph.scope(StructureType::Ring, NodeId(1));
        let members = scope.members();
        assert_eq!(members.len(), 3);
        assert!(scope.has_cycle());
        assert!(scope.forms_closed_cycle(&members));
        assert_eq!(scope.degree(NodeId(2)), 2);
    }

    #[test]
    fn test_open_chain_is_not_closed_cycle() {
        let mut graph = ring(&[1, 2, 3]);
        graph.disconnect(NodeId(3), NodeId(1)).unwrap();
        let scope = graph.scope(StructureType::Ring, NodeId(1));
        let members = scope.members();
        assert_eq!(members.len(), 3);
        assert!(!scope.has_cycle());
        assert!(!scope.forms_closed_cycle(&members));
    }

    #[test]
    fn test_two_cycles_are_not_one_closed_cycle() {
        // 1 -> 2 -> 1 and 3 -> 4 -> 3, evaluated as one candidate set
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=4 {
            graph.insert_node(NodeId(id), Shape::Ring).unwrap();
        }
        let h = heads(StructureType::Ring, 1);
        for (a, b) in [(1, 2), (2, 1), (3, 4), (4, 3)] {
            graph.add_child(NodeId(a), NodeId(b), &[], &h).unwrap();
        }
        let scope = graph.scope(StructureType::Ring, NodeId(1));
        let set: BTreeSet<NodeId> = (1..=4).map(NodeId).collect();
        assert!(!scope.forms_closed_cycle(&set));
        assert!(!scope.is_connected_within(&set));
    }

    #[test]
    fn test_depths_from_head() {
        let graph = sample_tree();
        let depths = graph.scope(StructureType::Tree, NodeId(1)).depths();
        assert_eq!(depths[&NodeId(1)], 0);
        assert_eq!(depths[&NodeId(3)], 1);
        assert_eq!(depths[&NodeId(5)], 2);
    }

    #[test]
    fn test_parent_chains() {
        let graph = sample_tree();
        assert!(graph.scope(StructureType::Tree, NodeId(1)).parent_chains_acyclic());

        // Closing a ring onto its head does not loop the parent chain
        let ring = ring(&[1, 2, 3]);
        assert!(ring.scope(StructureType::Ring, NodeId(1)).parent_chains_acyclic());

        // 2 and 3 adopt each other before the head reaches them
        let mut looped: StructureGraph = StructureGraph::new();
        for id in 1..=3 {
            looped.insert_node(NodeId(id), Shape::Tree).unwrap();
        }
        looped.set_head(NodeId(1), StructureType::Tree, true).unwrap();
        for (owner, child) in [(2, 3), (3, 2), (1, 2)] {
            looped
                .add_child(NodeId(owner), NodeId(child), &[], &heads(StructureType::Tree, 1))
                .unwrap();
        }
        assert_eq!(looped.parent(NodeId(2)), Some(NodeId(3)));
        assert!(!looped.scope(StructureType::Tree, NodeId(1)).parent_chains_acyclic());
    }
}
