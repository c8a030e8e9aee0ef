//! Arena of structure nodes and the mutations over it
//!
//! The [`StructureGraph`] owns every node and indexes them by id. Alongside
//! the per-node child edges it keeps a reverse index of which owners point
//! at each node, so traversals can walk parent-ward through every incoming
//! edge, not only the authoritative parent.
//!
//! Mutation is not internally synchronized. All `&mut self` operations must
//! be serialized by the caller.

use std::collections::{BTreeMap, BTreeSet};

use mirrorsim_core::{
    MirrorId, NodeId, StructureError, StructureResult, StructureType, Unbound,
};
use tracing::{debug, trace};

use crate::edge::TypedEdge;
use crate::node::StructureNode;
use crate::shape::Shape;

/// Outcome of a child mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    /// A new edge was created
    Inserted,
    /// An existing edge gained types
    Merged,
    /// The owner was at its child ceiling; nothing changed
    AtCapacity,
    /// Some types were stripped, the edge remains
    Narrowed,
    /// The edge was deleted
    Removed,
    /// There was no edge to change
    Unchanged,
}

/// Arena of structure nodes indexed by id
#[derive(Debug, Clone)]
pub struct StructureGraph<M = Unbound> {
    pub(crate) nodes: BTreeMap<NodeId, StructureNode>,
    /// child -> owners holding an edge to it
    pub(crate) incoming: BTreeMap<NodeId, BTreeSet<NodeId>>,
    pub(crate) mirrors: BTreeMap<NodeId, M>,
    pub(crate) mirror_owners: BTreeMap<MirrorId, NodeId>,
}

impl<M> Default for StructureGraph<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> StructureGraph<M> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            incoming: BTreeMap::new(),
            mirrors: BTreeMap::new(),
            mirror_owners: BTreeMap::new(),
        }
    }

    /// Add a node of the given shape
    pub fn insert_node(&mut self, id: NodeId, shape: Shape) -> StructureResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(StructureError::DuplicateNode(id));
        }
        self.nodes.insert(id, StructureNode::new(id, shape));
        self.incoming.insert(id, BTreeSet::new());
        trace!(node = %id, shape = %shape.structure_type(), "node inserted");
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&StructureNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Smallest id strictly greater than every id in use
    pub fn next_free_id(&self) -> NodeId {
        self.nodes
            .keys()
            .next_back()
            .map(|id| NodeId(id.0 + 1))
            .unwrap_or(NodeId(0))
    }

    pub(crate) fn node_or_err(&self, id: NodeId) -> StructureResult<&StructureNode> {
        self.nodes.get(&id).ok_or(StructureError::UnknownNode(id))
    }

    pub(crate) fn node_mut_or_err(&mut self, id: NodeId) -> StructureResult<&mut StructureNode> {
        self.nodes.get_mut(&id).ok_or(StructureError::UnknownNode(id))
    }

    /// Owners holding an edge to `id`
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming.get(&id).into_iter().flatten().copied()
    }

    /// Give a node an additional role, so it can represent `shape`'s type too
    pub fn add_role(&mut self, id: NodeId, shape: Shape) -> StructureResult<()> {
        self.node_mut_or_err(id)?.add_role(shape);
        Ok(())
    }

    /// Flag or unflag `id` as the head of its `ty` instance
    pub fn set_head(&mut self, id: NodeId, ty: StructureType, is_head: bool) -> StructureResult<()> {
        self.node_mut_or_err(id)?.set_head(ty, is_head);
        Ok(())
    }

    pub fn is_head(&self, id: NodeId, ty: StructureType) -> bool {
        self.nodes.get(&id).map(|n| n.is_head(ty)).unwrap_or(false)
    }

    /// Set the soft ceiling on direct children (`None` = unbounded)
    pub fn set_max_children(&mut self, id: NodeId, max: Option<usize>) -> StructureResult<()> {
        self.node_mut_or_err(id)?.set_max_children(max);
        Ok(())
    }

    /// Shape the node plays for `ty`
    pub fn role(&self, id: NodeId, ty: StructureType) -> Option<Shape> {
        self.nodes.get(&id).and_then(|n| n.role(ty)).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(StructureNode::parent)
    }

    /// Add or extend the edge `owner -> child`
    ///
    /// The child's primary type is added to `types`. Every resulting type
    /// needs a head in `heads`, otherwise the call is rejected and nothing
    /// changes. An existing edge has its types merged. A new edge is only
    /// created while the owner is below its child ceiling; at the ceiling
    /// the call is a no-op reported as [`EdgeChange::AtCapacity`].
    ///
    /// A new edge becomes the child's parent link only when the child has
    /// no parent yet and is not itself a head the edge names, so closing a
    /// ring onto its head leaves the head's parent alone.
    pub fn add_child(
        &mut self,
        owner: NodeId,
        child: NodeId,
        types: &[StructureType],
        heads: &BTreeMap<StructureType, NodeId>,
    ) -> StructureResult<EdgeChange> {
        if owner == child {
            return Err(StructureError::SelfEdge(owner));
        }
        let owner_node = self.node_or_err(owner)?;
        let child_node = self.node_or_err(child)?;

        let mut all_types: BTreeSet<StructureType> = types.iter().copied().collect();
        all_types.insert(child_node.primary_type());

        let missing: Vec<StructureType> = all_types
            .iter()
            .filter(|ty| !heads.contains_key(ty))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(StructureError::InvalidEdgeSpecification {
                owner,
                child,
                missing,
            });
        }

        let edge_heads: BTreeMap<StructureType, NodeId> =
            all_types.iter().map(|ty| (*ty, heads[ty])).collect();
        if let Some(unknown) = edge_heads.values().find(|head| !self.nodes.contains_key(head)) {
            return Err(StructureError::UnknownNode(*unknown));
        }

        if let Some(existing) = owner_node.edge_to(child) {
            let merged = existing.merged(&edge_heads);
            self.node_mut_or_err(owner)?.put_edge(merged);
            debug!(%owner, %child, types = ?all_types, "edge merged");
            return Ok(EdgeChange::Merged);
        }

        if !owner_node.has_capacity() {
            debug!(%owner, %child, max = ?owner_node.max_children(), "owner at child capacity, edge not added");
            return Ok(EdgeChange::AtCapacity);
        }

        let closes_onto_head = edge_heads.values().any(|head| *head == child);
        self.node_mut_or_err(owner)?
            .put_edge(TypedEdge::new(child, edge_heads));
        self.incoming.entry(child).or_default().insert(owner);

        let child_node = self.node_mut_or_err(child)?;
        if child_node.parent().is_none() && !closes_onto_head {
            child_node.set_parent(Some(owner));
        }
        trace!(%owner, %child, types = ?all_types, "edge inserted");
        Ok(EdgeChange::Inserted)
    }

    /// Untyped `add_child`: tag the edge with the child's primary type,
    /// scoped to the nearest head of that type at or above `owner`
    pub fn attach_child(&mut self, owner: NodeId, child: NodeId) -> StructureResult<EdgeChange> {
        let ty = self.node_or_err(child)?.primary_type();
        self.node_or_err(owner)?;
        let mut heads = BTreeMap::new();
        if let Some(head) = self.find_head(owner, ty) {
            heads.insert(ty, head);
        }
        self.add_child(owner, child, &[], &heads)
    }

    /// Strip `types` from the edge `owner -> child`
    ///
    /// When no type remains the edge is deleted, and the child's parent is
    /// cleared if it still points at `owner`.
    pub fn remove_child(
        &mut self,
        owner: NodeId,
        child: NodeId,
        types: &[StructureType],
    ) -> StructureResult<EdgeChange> {
        let Some(edge) = self.node_or_err(owner)?.edge_to(child) else {
            return Ok(EdgeChange::Unchanged);
        };
        match edge.without(types) {
            Some(narrowed) if narrowed == *edge => Ok(EdgeChange::Unchanged),
            Some(narrowed) => {
                self.node_mut_or_err(owner)?.put_edge(narrowed);
                trace!(%owner, %child, stripped = ?types, "edge narrowed");
                Ok(EdgeChange::Narrowed)
            }
            None => {
                self.delete_edge(owner, child)?;
                Ok(EdgeChange::Removed)
            }
        }
    }

    /// Untyped `remove_child`: delete the edge whatever its types
    pub fn disconnect(&mut self, owner: NodeId, child: NodeId) -> StructureResult<EdgeChange> {
        if self.node_or_err(owner)?.edge_to(child).is_none() {
            return Ok(EdgeChange::Unchanged);
        }
        self.delete_edge(owner, child)?;
        Ok(EdgeChange::Removed)
    }

    fn delete_edge(&mut self, owner: NodeId, child: NodeId) -> StructureResult<()> {
        self.node_mut_or_err(owner)?.take_edge(child);
        if let Some(owners) = self.incoming.get_mut(&child) {
            owners.remove(&owner);
        }
        if let Some(child_node) = self.nodes.get_mut(&child) {
            if child_node.parent() == Some(owner) {
                child_node.set_parent(None);
            }
        }
        trace!(%owner, %child, "edge removed");
        Ok(())
    }

    /// Make the existing edge `parent -> child` the child's parent link
    pub fn reparent(&mut self, child: NodeId, parent: NodeId) -> StructureResult<()> {
        if self.node_or_err(parent)?.edge_to(child).is_none() {
            return Err(StructureError::MissingEdge {
                owner: parent,
                child,
            });
        }
        self.node_mut_or_err(child)?.set_parent(Some(parent));
        Ok(())
    }

    /// Drop every edge into and out of `id` and clear its parent
    pub fn detach_node(&mut self, id: NodeId) -> StructureResult<()> {
        let children: Vec<NodeId> = self.node_or_err(id)?.child_ids().collect();
        for child in children {
            self.delete_edge(id, child)?;
        }
        let owners: Vec<NodeId> = self.incoming(id).collect();
        for owner in owners {
            self.delete_edge(owner, id)?;
        }
        self.node_mut_or_err(id)?.set_parent(None);
        debug!(node = %id, "node detached");
        Ok(())
    }

    /// Detach `id` and drop it from the arena, returning its bound mirror
    pub fn remove_node(&mut self, id: NodeId) -> StructureResult<Option<M>> {
        self.detach_node(id)?;
        self.nodes.remove(&id);
        self.incoming.remove(&id);
        self.mirror_owners.retain(|_, owner| *owner != id);
        Ok(self.mirrors.remove(&id))
    }

    /// Nearest node at or above `id`, following parent links, that heads `ty`
    pub fn find_head(&self, id: NodeId, ty: StructureType) -> Option<NodeId> {
        let mut visited = BTreeSet::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if !visited.insert(node_id) {
                return None;
            }
            let node = self.nodes.get(&node_id)?;
            if node.is_head(ty) {
                return Some(node_id);
            }
            current = node.parent();
        }
        None
    }

    /// Parent-link hops from `id` to the top of its chain
    ///
    /// A chain that loops back on itself stops at the first revisit.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut visited = BTreeSet::new();
        visited.insert(id);
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(node_id) = current {
            if !visited.insert(node_id) {
                break;
            }
            depth += 1;
            current = self.parent(node_id);
        }
        depth
    }
}
