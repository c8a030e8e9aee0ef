//! Shape kinds and their parameters
//!
//! Each [`Shape`] fixes the [`StructureType`] it derives and carries the
//! parameters its validators need. Validation, growth and shrink policy
//! dispatch over this enum in [`crate::variants`].

use mirrorsim_core::{StructureError, StructureResult, StructureType};
use serde::{Deserialize, Serialize};

/// Smallest N an N-connected structure accepts
///
/// A 1-regular graph on more than two nodes is never connected.
pub const MIN_CONNECTIVITY_DEGREE: usize = 2;

/// Shape kind of a node role, with its parameter payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Bare structure node with no shape of its own
    Plain,
    /// Mirror-binding node with no shape of its own
    Mirror,
    Tree,
    Line,
    BalancedTree {
        target_links_per_node: usize,
        max_deviation: f64,
    },
    DepthLimitedTree {
        max_depth: usize,
    },
    Ring,
    Star,
    FullyConnected,
    NConnected {
        degree: usize,
    },
}

impl Shape {
    /// Balanced tree aiming at `target_links_per_node` children per inner node
    pub fn balanced_tree(target_links_per_node: usize, max_deviation: f64) -> StructureResult<Self> {
        if target_links_per_node == 0 {
            return Err(StructureError::InvalidShapeParameter {
                shape: StructureType::BalancedTree,
                reason: "target links per node must be at least 1".to_string(),
            });
        }
        if !max_deviation.is_finite() || max_deviation < 0.0 {
            return Err(StructureError::InvalidShapeParameter {
                shape: StructureType::BalancedTree,
                reason: format!("max deviation must be a non-negative number, got {max_deviation}"),
            });
        }
        Ok(Shape::BalancedTree {
            target_links_per_node,
            max_deviation,
        })
    }

    /// Tree whose members all sit at depth below `max_depth`
    pub fn depth_limited_tree(max_depth: usize) -> StructureResult<Self> {
        if max_depth == 0 {
            return Err(StructureError::InvalidShapeParameter {
                shape: StructureType::DepthLimitedTree,
                reason: "max depth must be at least 1".to_string(),
            });
        }
        Ok(Shape::DepthLimitedTree { max_depth })
    }

    /// Structure in which every member connects to `min(degree, n - 1)` others
    pub fn n_connected(degree: usize) -> StructureResult<Self> {
        if degree < MIN_CONNECTIVITY_DEGREE {
            return Err(StructureError::InvalidShapeParameter {
                shape: StructureType::NConnected,
                reason: format!("degree must be at least {MIN_CONNECTIVITY_DEGREE}, got {degree}"),
            });
        }
        Ok(Shape::NConnected { degree })
    }

    /// The structure type this shape derives
    pub fn structure_type(&self) -> StructureType {
        match self {
            Shape::Plain => StructureType::Default,
            Shape::Mirror => StructureType::Mirror,
            Shape::Tree => StructureType::Tree,
            Shape::Line => StructureType::Line,
            Shape::BalancedTree { .. } => StructureType::BalancedTree,
            Shape::DepthLimitedTree { .. } => StructureType::DepthLimitedTree,
            Shape::Ring => StructureType::Ring,
            Shape::Star => StructureType::Star,
            Shape::FullyConnected => StructureType::FullyConnected,
            Shape::NConnected { .. } => StructureType::NConnected,
        }
    }

    /// Number of links a complete instance with `n` members plans
    pub fn planned_links(&self, n: usize) -> usize {
        match self {
            Shape::Ring if n >= 3 => n,
            Shape::FullyConnected => n * n.saturating_sub(1) / 2,
            Shape::NConnected { degree } => {
                let d = (*degree).min(n.saturating_sub(1));
                (n * d).div_ceil(2)
            }
            _ => n.saturating_sub(1),
        }
    }

    /// Whether a nested head of this shape must carry a boundary link
    pub fn requires_head_boundary(&self) -> bool {
        !matches!(self, Shape::Plain | Shape::Mirror | Shape::NConnected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_validation() {
        assert!(Shape::balanced_tree(0, 1.0).is_err());
        assert!(Shape::balanced_tree(2, -0.5).is_err());
        assert!(Shape::balanced_tree(2, f64::NAN).is_err());
        assert!(Shape::balanced_tree(2, 0.5).is_ok());
        assert!(Shape::depth_limited_tree(0).is_err());
        assert!(Shape::n_connected(1).is_err());
        assert_eq!(Shape::n_connected(2).unwrap(), Shape::NConnected { degree: 2 });
    }

    #[test]
    fn test_planned_links_per_shape() {
        assert_eq!(Shape::Tree.planned_links(5), 4);
        assert_eq!(Shape::Star.planned_links(5), 4);
        assert_eq!(Shape::Line.planned_links(1), 0);
        assert_eq!(Shape::Ring.planned_links(5), 5);
        assert_eq!(Shape::Ring.planned_links(2), 1);
        assert_eq!(Shape::FullyConnected.planned_links(4), 6);
        assert_eq!(Shape::NConnected { degree: 2 }.planned_links(5), 5);
        assert_eq!(Shape::NConnected { degree: 3 }.planned_links(3), 3);
        assert_eq!(Shape::NConnected { degree: 3 }.planned_links(5), 8);
    }

    #[test]
    fn test_structure_type_mapping() {
        assert_eq!(Shape::Plain.structure_type(), StructureType::Default);
        assert_eq!(
            Shape::depth_limited_tree(3).unwrap().structure_type(),
            StructureType::DepthLimitedTree
        );
        assert!(!Shape::NConnected { degree: 2 }.requires_head_boundary());
        assert!(Shape::Ring.requires_head_boundary());
    }
}
