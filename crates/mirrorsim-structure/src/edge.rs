//! Typed parent -> child edge records
//!
//! A [`TypedEdge`] annotates one owner -> child edge with every structure
//! type the edge participates in and, per type, the head that scopes the
//! structure instance. The type set is the key set of that mapping, so a
//! type without a head cannot be represented.

use std::collections::{BTreeMap, BTreeSet};

use mirrorsim_core::{NodeId, StructureType};
use serde::{Deserialize, Serialize};

/// Annotation on a single owner -> child edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedEdge {
    child: NodeId,
    heads: BTreeMap<StructureType, NodeId>,
}

impl TypedEdge {
    pub fn new(child: NodeId, heads: BTreeMap<StructureType, NodeId>) -> Self {
        Self { child, heads }
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    /// Structure types this edge belongs to
    pub fn types(&self) -> impl Iterator<Item = StructureType> + '_ {
        self.heads.keys().copied()
    }

    pub fn type_set(&self) -> BTreeSet<StructureType> {
        self.heads.keys().copied().collect()
    }

    /// Head scoping this edge for `ty`
    pub fn head_for(&self, ty: StructureType) -> Option<NodeId> {
        self.heads.get(&ty).copied()
    }

    pub fn heads(&self) -> &BTreeMap<StructureType, NodeId> {
        &self.heads
    }

    /// Whether the edge is tagged with exactly this `(ty, head)` instance
    pub fn is_tagged(&self, ty: StructureType, head: NodeId) -> bool {
        self.heads.get(&ty) == Some(&head)
    }

    /// Union with another head mapping; on a conflicting head the incoming one wins
    pub fn merged(&self, heads: &BTreeMap<StructureType, NodeId>) -> Self {
        let mut merged = self.heads.clone();
        merged.extend(heads.iter().map(|(ty, head)| (*ty, *head)));
        Self {
            child: self.child,
            heads: merged,
        }
    }

    /// The edge with `types` stripped, or `None` when nothing remains
    pub fn without(&self, types: &[StructureType]) -> Option<Self> {
        let heads: BTreeMap<_, _> = self
            .heads
            .iter()
            .filter(|(ty, _)| !types.contains(ty))
            .map(|(ty, head)| (*ty, *head))
            .collect();
        if heads.is_empty() {
            None
        } else {
            Some(Self {
                child: self.child,
                heads,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heads(pairs: &[(StructureType, u32)]) -> BTreeMap<StructureType, NodeId> {
        pairs.iter().map(|(ty, h)| (*ty, NodeId(*h))).collect()
    }

    #[test]
    fn test_merge_unions_types() {
        let edge = TypedEdge::new(NodeId(2), heads(&[(StructureType::Tree, 1)]));
        let merged = edge.merged(&heads(&[(StructureType::Ring, 5)]));

        assert_eq!(merged.child(), NodeId(2));
        assert!(merged.is_tagged(StructureType::Tree, NodeId(1)));
        assert!(merged.is_tagged(StructureType::Ring, NodeId(5)));
        assert_eq!(merged.type_set().len(), 2);
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let edge = TypedEdge::new(NodeId(2), heads(&[(StructureType::Tree, 1)]));
        let merged = edge.merged(&heads(&[(StructureType::Tree, 9)]));
        assert_eq!(merged.head_for(StructureType::Tree), Some(NodeId(9)));
        assert!(!merged.is_tagged(StructureType::Tree, NodeId(1)));
    }

    #[test]
    fn test_without_strips_and_empties() {
        let edge = TypedEdge::new(
            NodeId(2),
            heads(&[(StructureType::Tree, 1), (StructureType::Ring, 1)]),
        );
        let narrowed = edge.without(&[StructureType::Ring]).unwrap();
        assert_eq!(narrowed.types().collect::<Vec<_>>(), vec![StructureType::Tree]);
        assert!(narrowed.without(&[StructureType::Tree]).is_none());
    }
}
