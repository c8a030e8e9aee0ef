//! Identifiers and structure kinds shared across mirrorsim

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier of a node in a structure graph
///
/// Globally unique and immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Raw integer value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Unique identifier of a simulated mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MirrorId(pub u32);

impl fmt::Display for MirrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Unique identifier of a simulated link between two mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// Kinds of structure a node can represent and an edge can be tagged with
///
/// Used both as an edge tag and as the key of a node's per-type head flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StructureType {
    Default,
    Mirror,
    Tree,
    Ring,
    Line,
    Star,
    FullyConnected,
    NConnected,
    BalancedTree,
    DepthLimitedTree,
}

impl StructureType {
    /// Every structure type, in declaration order
    pub const ALL: [StructureType; 10] = [
        StructureType::Default,
        StructureType::Mirror,
        StructureType::Tree,
        StructureType::Ring,
        StructureType::Line,
        StructureType::Star,
        StructureType::FullyConnected,
        StructureType::NConnected,
        StructureType::BalancedTree,
        StructureType::DepthLimitedTree,
    ];

    /// Whether instances of this type must be acyclic trees
    pub fn is_tree_like(self) -> bool {
        matches!(
            self,
            StructureType::Tree
                | StructureType::Line
                | StructureType::Star
                | StructureType::BalancedTree
                | StructureType::DepthLimitedTree
        )
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StructureType::Default => "default",
            StructureType::Mirror => "mirror",
            StructureType::Tree => "tree",
            StructureType::Ring => "ring",
            StructureType::Line => "line",
            StructureType::Star => "star",
            StructureType::FullyConnected => "fully-connected",
            StructureType::NConnected => "n-connected",
            StructureType::BalancedTree => "balanced-tree",
            StructureType::DepthLimitedTree => "depth-limited-tree",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_ordering() {
        let mut ids = vec![NodeId(3), NodeId(1), NodeId(2)];
        ids.sort();
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(NodeId::from(7).get(), 7);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(NodeId(4).to_string(), "n4");
        assert_eq!(MirrorId(4).to_string(), "m4");
        assert_eq!(LinkId(9).to_string(), "l9");
        assert_eq!(StructureType::NConnected.to_string(), "n-connected");
    }

    #[test]
    fn test_tree_like_types() {
        assert!(StructureType::Star.is_tree_like());
        assert!(StructureType::DepthLimitedTree.is_tree_like());
        assert!(!StructureType::Ring.is_tree_like());
        assert!(!StructureType::FullyConnected.is_tree_like());
    }

    #[test]
    fn test_structure_type_serde() {
        let json = serde_json::to_string(&StructureType::BalancedTree).unwrap();
        let back: StructureType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StructureType::BalancedTree);
    }
}
