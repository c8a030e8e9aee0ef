//! Path discovery from a structure head
//!
//! Paths follow scoped adjacency in either direction and never revisit a
//! node. Candidates are ordered by edge count, then by the sum of node ids
//! on the path, then lexicographically, so results are deterministic.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use mirrorsim_core::{NodeId, StructureType};

use crate::graph::StructureGraph;
use crate::scope::Scope;

/// Ordering key of a partial path: `(edges, id sum, nodes)`
type PathKey = (usize, u64, Vec<NodeId>);

fn path_key(path: Vec<NodeId>) -> PathKey {
    let sum = path.iter().map(|id| u64::from(id.0)).sum();
    (path.len() - 1, sum, path)
}

impl<M> Scope<'_, M> {
    /// Shortest simple path from the head to `target`
    ///
    /// Best-first over partial paths. A node is settled the first time a
    /// path ending in it is popped; since both ordering components grow as
    /// a path is extended, that first path is the minimal one.
    pub fn path_from_head(&self, target: NodeId) -> Option<Vec<NodeId>> {
        let members = self.members();
        if !members.contains(&target) {
            return None;
        }
        let mut settled = BTreeSet::new();
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse(path_key(vec![self.head()])));

        while let Some(Reverse((_, _, path))) = frontier.pop() {
            let Some(&last) = path.last() else { continue };
            if !settled.insert(last) {
                continue;
            }
            if last == target {
                return Some(path);
            }
            if self.is_boundary(last) {
                continue;
            }
            for next in self.neighbors_within(last, &members) {
                if !settled.contains(&next) && !path.contains(&next) {
                    let mut extended = path.clone();
                    extended.push(next);
                    frontier.push(Reverse(path_key(extended)));
                }
            }
        }
        None
    }

    /// Every simple path from the head to `target`, shortest first
    ///
    /// The count grows combinatorially on dense instances; meant for
    /// analytics over small structures.
    pub fn all_paths_from_head(&self, target: NodeId) -> Vec<Vec<NodeId>> {
        let members = self.members();
        if !members.contains(&target) {
            return Vec::new();
        }
        let mut found: Vec<PathKey> = Vec::new();
        let mut worklist = vec![vec![self.head()]];

        while let Some(path) = worklist.pop() {
            let Some(&last) = path.last() else { continue };
            if last == target {
                found.push(path_key(path));
                continue;
            }
            if self.is_boundary(last) {
                continue;
            }
            for next in self.neighbors_within(last, &members) {
                if !path.contains(&next) {
                    let mut extended = path.clone();
                    extended.push(next);
                    worklist.push(extended);
                }
            }
        }
        found.sort();
        found.into_iter().map(|(_, _, path)| path).collect()
    }

    /// Edges on the shortest path from the head to `target`
    pub fn depth_of(&self, target: NodeId) -> Option<usize> {
        self.path_from_head(target).map(|path| path.len() - 1)
    }
}

impl<M> StructureGraph<M> {
    /// Shortest path from `head` to `id` through `(ty, head)` edges
    pub fn path_from_head(&self, id: NodeId, ty: StructureType, head: NodeId) -> Option<Vec<NodeId>> {
        self.scope(ty, head).path_from_head(id)
    }

    /// Depth of `id` inside the `ty` instance headed by its nearest head
    pub fn depth_in_tree(&self, id: NodeId, ty: StructureType) -> Option<usize> {
        let head = self.find_head(id, ty)?;
        self.scope(ty, head).depth_of(id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::shape::Shape;

    /// Diamond 1 -> {2, 3} -> 4 plus a long way 1 -> 5 -> 6 -> 4
    fn diamond() -> StructureGraph {
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=6 {
            graph.insert_node(NodeId(id), Shape::FullyConnected).unwrap();
        }
        graph.set_head(NodeId(1), StructureType::FullyConnected, true).unwrap();
        let heads = BTreeMap::from([(StructureType::FullyConnected, NodeId(1))]);
        for (a, b) in [(1, 3), (1, 2), (2, 4), (3, 4), (1, 5), (5, 6), (6, 4)] {
            graph.add_child(NodeId(a), NodeId(b), &[], &heads).unwrap();
        }
        graph
    }

    #[test]
    fn test_shortest_path_tie_broken_by_id_sum() {
        let graph = diamond();
        let path = graph
            .path_from_head(NodeId(4), StructureType::FullyConnected, NodeId(1))
            .unwrap();
        assert_eq!(path, vec![NodeId(1), NodeId(2), NodeId(4)]);
    }

    #[test]
    fn test_path_to_head_is_trivial() {
        let graph = diamond();
        let scope = graph.scope(StructureType::FullyConnected, NodeId(1));
        assert_eq!(scope.path_from_head(NodeId(1)), Some(vec![NodeId(1)]));
        assert_eq!(scope.depth_of(NodeId(1)), Some(0));
        assert_eq!(scope.path_from_head(NodeId(99)), None);
    }

    #[test]
    fn test_all_paths_ordered() {
        let graph = diamond();
        let paths = graph
            .scope(StructureType::FullyConnected, NodeId(1))
            .all_paths_from_head(NodeId(4));
        assert_eq!(
            paths,
            vec![
                vec![NodeId(1), NodeId(2), NodeId(4)],
                vec![NodeId(1), NodeId(3), NodeId(4)],
                vec![NodeId(1), NodeId(5), NodeId(6), NodeId(4)],
            ]
        );
        let shortest = graph
            .scope(StructureType::FullyConnected, NodeId(1))
            .path_from_head(NodeId(4))
            .unwrap();
        assert_eq!(paths[0], shortest);
    }

    #[test]
    fn test_depth_in_tree() {
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=5 {
            graph.insert_node(NodeId(id), Shape::Tree).unwrap();
        }
        graph.set_head(NodeId(1), StructureType::Tree, true).unwrap();
        for (owner, child) in [(1, 2), (1, 3), (2, 4), (3, 5)] {
            graph.attach_child(NodeId(owner), NodeId(child)).unwrap();
        }
        assert_eq!(graph.depth_in_tree(NodeId(5), StructureType::Tree), Some(2));
        assert_eq!(graph.depth_in_tree(NodeId(1), StructureType::Tree), Some(0));
        assert_eq!(graph.depth_in_tree(NodeId(5), StructureType::Ring), None);
    }
}
