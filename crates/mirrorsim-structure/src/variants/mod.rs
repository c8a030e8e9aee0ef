//! Per-shape validators, growth and shrink policies
//!
//! Every structure instance is judged by the shape its head declares for
//! the instance's type. Dispatch is a single `match` over [`Shape`]; each
//! shape family lives in its own module and only supplies the policy that
//! differs, sharing the traversal and cycle machinery of [`Scope`].
//!
//! | Shape | Grow | Shrink |
//! |---|---|---|
//! | Tree | stays valid | leaf, ≥2 remain |
//! | Line | no child yet | tail leaf, ≥2 remain |
//! | Balanced tree | tree + below target fan-out | tree + removal impact within deviation |
//! | Depth-limited tree | tree + depth < max − 1 | tree |
//! | Ring | no child yet | ≥4 before removal |
//! | Star | center only | terminal leaf, ≥4 before removal |
//! | Fully connected | stays valid | not head, ≥3 before removal |
//! | N-connected | degree < min(N, n − 1) | not head, > N + 1 before removal |

pub mod connected;
pub mod ring;
pub mod star;
pub mod tree;

use mirrorsim_core::{MirrorPayload, NodeId, StructureType};
use tracing::debug;

use crate::graph::StructureGraph;
use crate::scope::Scope;
use crate::shape::Shape;

/// Shape-free instances: acyclic, with parent chains that terminate
fn generic_is_valid<M>(scope: &Scope<'_, M>) -> bool {
    !scope.has_cycle() && scope.parent_chains_acyclic()
}

impl<M: MirrorPayload> StructureGraph<M> {
    /// Whether the `ty` instance `node` belongs to satisfies its invariants
    ///
    /// The instance is the one headed by `node`'s nearest `ty` head. A node
    /// with no such head is never valid.
    pub fn is_valid_structure(&self, node: NodeId, ty: StructureType) -> bool {
        match self.find_head(node, ty) {
            Some(head) => self.is_valid_instance(ty, head),
            None => false,
        }
    }

    /// Whether the `(ty, head)` instance satisfies its invariants
    ///
    /// Graph-level invariants of the head's shape first, then link-level
    /// consistency against any bound mirrors.
    pub fn is_valid_instance(&self, ty: StructureType, head: NodeId) -> bool {
        let Some(shape) = self.role(head, ty) else {
            return false;
        };
        if !self.is_head(head, ty) {
            return false;
        }
        let scope = self.scope(ty, head);
        let graph_valid = match shape {
            Shape::Plain | Shape::Mirror => generic_is_valid(&scope),
            Shape::Tree => tree::is_valid_tree(&scope),
            Shape::Line => tree::is_valid_line(&scope),
            Shape::BalancedTree {
                target_links_per_node,
                max_deviation,
            } => tree::is_valid_balanced(&scope, target_links_per_node, max_deviation),
            Shape::DepthLimitedTree { max_depth } => tree::is_valid_depth_limited(&scope, max_depth),
            Shape::Ring => ring::is_valid(&scope),
            Shape::Star => star::is_valid(&scope),
            Shape::FullyConnected => connected::is_valid_fully_connected(&scope),
            Shape::NConnected { degree } => connected::is_valid_n_connected(&scope, degree),
        };
        if !graph_valid {
            debug!(%ty, %head, "structure invariant violated");
            return false;
        }
        scope.links_consistent(shape.requires_head_boundary())
    }

    /// Whether `node` may take another child in its `ty` instance
    pub fn can_accept_more_children(&self, node: NodeId, ty: StructureType) -> bool {
        let Some(head) = self.find_head(node, ty) else {
            return false;
        };
        let Some(shape) = self.role(head, ty) else {
            return false;
        };
        let Some(record) = self.node(node) else {
            return false;
        };
        if !record.has_capacity() {
            return false;
        }
        let scope = self.scope(ty, head);
        if !scope.members().contains(&node) {
            return false;
        }
        match shape {
            Shape::Plain | Shape::Mirror => true,
            Shape::Tree => tree::is_valid_tree(&scope),
            Shape::Line => tree::line_can_grow(&scope, node),
            Shape::BalancedTree {
                target_links_per_node,
                ..
            } => tree::balanced_can_grow(&scope, node, target_links_per_node),
            Shape::DepthLimitedTree { max_depth } => tree::depth_limited_can_grow(&scope, node, max_depth),
            Shape::Ring => ring::can_grow(&scope, node),
            Shape::Star => star::can_grow(&scope, node),
            Shape::FullyConnected => connected::is_valid_fully_connected(&scope),
            Shape::NConnected { degree } => connected::n_connected_can_grow(&scope, node, degree),
        }
    }

    /// Whether `node` may leave the `(ty, head)` instance
    ///
    /// Takes `&mut self` because the balanced-tree policy probes the removal
    /// on the live structure; the structure is unchanged afterwards.
    pub fn can_be_removed_from_structure(&mut self, node: NodeId, ty: StructureType, head: NodeId) -> bool {
        let Some(shape) = self.role(head, ty) else {
            return false;
        };
        let scope = self.scope(ty, head);
        let members = scope.members();
        if !members.contains(&node) {
            return false;
        }
        match shape {
            Shape::Plain | Shape::Mirror => node != head,
            Shape::Tree | Shape::Line | Shape::DepthLimitedTree { .. } => {
                tree::tree_can_shrink(&scope, node)
            }
            Shape::BalancedTree { max_deviation, .. } => {
                if !tree::tree_can_shrink(&scope, node) {
                    return false;
                }
                match self.removal_impact(node, ty, head) {
                    Ok(impact) => impact <= max_deviation,
                    Err(err) => {
                        debug!(%node, error = %err, "removal impact probe failed");
                        false
                    }
                }
            }
            Shape::Ring => ring::can_shrink(&scope, node),
            Shape::Star => star::can_shrink(&scope, node),
            Shape::FullyConnected => connected::fully_connected_can_shrink(&scope, node),
            Shape::NConnected { degree } => connected::n_connected_can_shrink(&scope, node, degree),
        }
    }
}
