//! Star policies
//!
//! The head is the center. Every other member hangs directly off it, holds
//! no scoped children and has the center as its parent.

use mirrorsim_core::NodeId;
use tracing::trace;

use crate::scope::Scope;

/// Smallest star the validator accepts: a center and two spokes
pub const MIN_STAR_SIZE: usize = 3;

pub(crate) fn is_valid<M>(scope: &Scope<'_, M>) -> bool {
    let members = scope.members();
    let n = members.len();
    let center = scope.head();
    if n < MIN_STAR_SIZE || scope.child_count(center) < 2 {
        return false;
    }
    let graph = scope.graph();
    let spokes_ok = members.iter().filter(|id| **id != center).all(|id| {
        let parents: Vec<NodeId> = scope.tagged_parents(*id).collect();
        let ok = graph.parent(*id) == Some(center)
            && parents == [center]
            && scope.tagged_children(*id).next().is_none();
        if !ok {
            trace!(spoke = %id, %center, "spoke does not hang off the center");
        }
        ok
    });
    spokes_ok && !scope.has_cycle() && scope.edge_count_within(&members) == n - 1
}

pub(crate) fn can_grow<M>(scope: &Scope<'_, M>, node: NodeId) -> bool {
    node == scope.head()
}

pub(crate) fn can_shrink<M>(scope: &Scope<'_, M>, node: NodeId) -> bool {
    node != scope.head()
        && scope.is_terminal(node)
        && scope.is_leaf(node)
        && scope.members().len() > MIN_STAR_SIZE
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mirrorsim_core::StructureType;

    use crate::graph::StructureGraph;
    use crate::shape::Shape;

    use super::*;

    fn star(spokes: u32) -> StructureGraph {
        let mut graph: StructureGraph = StructureGraph::new();
        for id in 1..=spokes + 1 {
            graph.insert_node(NodeId(id), Shape::Star).unwrap();
        }
        graph.set_head(NodeId(1), StructureType::Star, true).unwrap();
        for id in 2..=spokes + 1 {
            graph.attach_child(NodeId(1), NodeId(id)).unwrap();
        }
        graph
    }

    #[test]
    fn test_star_validity() {
        assert!(star(2).is_valid_instance(StructureType::Star, NodeId(1)));
        assert!(star(5).is_valid_instance(StructureType::Star, NodeId(1)));
        assert!(!star(1).is_valid_instance(StructureType::Star, NodeId(1)));
    }

    #[test]
    fn test_only_center_grows() {
        let graph = star(3);
        assert!(graph.can_accept_more_children(NodeId(1), StructureType::Star));
        assert!(!graph.can_accept_more_children(NodeId(2), StructureType::Star));
    }

    #[test]
    fn test_star_shrink_floor() {
        let mut small = star(2);
        assert!(!small.can_be_removed_from_structure(NodeId(2), StructureType::Star, NodeId(1)));
        let mut large = star(3);
        assert!(large.can_be_removed_from_structure(NodeId(2), StructureType::Star, NodeId(1)));
        assert!(!large.can_be_removed_from_structure(NodeId(1), StructureType::Star, NodeId(1)));
    }

    #[test]
    fn test_spoke_with_child_is_invalid() {
        let mut graph = star(3);
        graph.insert_node(NodeId(9), Shape::Star).unwrap();
        let heads = BTreeMap::from([(StructureType::Star, NodeId(1))]);
        graph.add_child(NodeId(2), NodeId(9), &[], &heads).unwrap();
        assert!(!graph.is_valid_instance(StructureType::Star, NodeId(1)));
    }

    #[test]
    fn test_center_hosts_nested_ring() {
        // The center is primarily a ring head that also plays the star;
        // ring members never join the star
        let mut graph: StructureGraph = StructureGraph::new();
        graph.insert_node(NodeId(1), Shape::Ring).unwrap();
        graph.add_role(NodeId(1), Shape::Star).unwrap();
        graph.set_head(NodeId(1), StructureType::Ring, true).unwrap();
        graph.set_head(NodeId(1), StructureType::Star, true).unwrap();
        for id in 2..=4 {
            graph.insert_node(NodeId(id), Shape::Star).unwrap();
            graph.attach_child(NodeId(1), NodeId(id)).unwrap();
        }
        for id in 10..=11 {
            graph.insert_node(NodeId(id), Shape::Ring).unwrap();
        }
        let ring = BTreeMap::from([(StructureType::Ring, NodeId(1))]);
        for (a, b) in [(1, 10), (10, 11), (11, 1)] {
            graph.add_child(NodeId(a), NodeId(b), &[], &ring).unwrap();
        }
        assert!(graph.is_valid_instance(StructureType::Star, NodeId(1)));
        assert!(graph.is_valid_instance(StructureType::Ring, NodeId(1)));
        assert_eq!(graph.all_nodes_in_structure(StructureType::Star, NodeId(1)).len(), 4);
        assert_eq!(graph.all_nodes_in_structure(StructureType::Ring, NodeId(1)).len(), 3);
    }
}
