//! Structure graph node records
//!
//! A [`StructureNode`] lives in the arena of a
//! [`StructureGraph`](crate::StructureGraph). Its parent and children are
//! ids into that arena, so reference cycles are a data condition the
//! validators detect rather than an ownership problem.

use std::collections::BTreeMap;

use mirrorsim_core::{NodeId, StructureType};

use crate::edge::TypedEdge;
use crate::shape::Shape;

/// One node of a structure graph
#[derive(Debug, Clone)]
pub struct StructureNode {
    id: NodeId,
    primary: Shape,
    /// Every shape this node takes part in, keyed by derived type
    roles: BTreeMap<StructureType, Shape>,
    head_flags: BTreeMap<StructureType, bool>,
    max_children: Option<usize>,
    parent: Option<NodeId>,
    children: BTreeMap<NodeId, TypedEdge>,
}

impl StructureNode {
    pub(crate) fn new(id: NodeId, primary: Shape) -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(primary.structure_type(), primary);
        Self {
            id,
            primary,
            roles,
            head_flags: BTreeMap::new(),
            max_children: None,
            parent: None,
            children: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The shape this node was created as
    pub fn shape(&self) -> &Shape {
        &self.primary
    }

    /// Type auto-added to every edge that points at this node
    pub fn primary_type(&self) -> StructureType {
        self.primary.structure_type()
    }

    /// Types this node represents
    pub fn represented_types(&self) -> impl Iterator<Item = StructureType> + '_ {
        self.roles.keys().copied()
    }

    pub fn represents(&self, ty: StructureType) -> bool {
        self.roles.contains_key(&ty)
    }

    /// Shape this node plays for `ty`
    pub fn role(&self, ty: StructureType) -> Option<&Shape> {
        self.roles.get(&ty)
    }

    pub fn is_head(&self, ty: StructureType) -> bool {
        self.head_flags.get(&ty).copied().unwrap_or(false)
    }

    pub fn max_children(&self) -> Option<usize> {
        self.max_children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> impl Iterator<Item = &TypedEdge> + '_ {
        self.children.values()
    }

    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.keys().copied()
    }

    pub fn edge_to(&self, child: NodeId) -> Option<&TypedEdge> {
        self.children.get(&child)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether another distinct child fits under the soft ceiling
    pub fn has_capacity(&self) -> bool {
        self.max_children
            .map(|max| self.children.len() < max)
            .unwrap_or(true)
    }

    pub(crate) fn add_role(&mut self, shape: Shape) -> Option<Shape> {
        self.roles.insert(shape.structure_type(), shape)
    }

    pub(crate) fn set_head(&mut self, ty: StructureType, is_head: bool) {
        self.head_flags.insert(ty, is_head);
    }

    pub(crate) fn set_max_children(&mut self, max: Option<usize>) {
        self.max_children = max;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn put_edge(&mut self, edge: TypedEdge) {
        self.children.insert(edge.child(), edge);
    }

    pub(crate) fn take_edge(&mut self, child: NodeId) -> Option<TypedEdge> {
        self.children.remove(&child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_represents_primary_type() {
        let node = StructureNode::new(NodeId(1), Shape::Tree);
        assert_eq!(node.primary_type(), StructureType::Tree);
        assert!(node.represents(StructureType::Tree));
        assert!(!node.represents(StructureType::Ring));
        assert!(!node.is_head(StructureType::Tree));
        assert!(node.parent().is_none());
        assert!(node.has_capacity());
    }

    #[test]
    fn test_roles_and_capacity() {
        let mut node = StructureNode::new(NodeId(1), Shape::Star);
        node.add_role(Shape::Ring);
        assert_eq!(node.represented_types().count(), 2);
        assert_eq!(node.role(StructureType::Ring), Some(&Shape::Ring));

        node.set_max_children(Some(0));
        assert!(!node.has_capacity());
    }
}
