//! Mirror binding: planned structure versus implemented links
//!
//! A node may carry an externally owned [`MirrorPayload`]. The structure's
//! edges are the *plan*; the mirrors' open links are what is *implemented*.
//! This module reconciles the two for one structure instance.

use std::collections::{BTreeMap, BTreeSet};

use mirrorsim_core::{LinkEnds, LinkId, MirrorId, MirrorPayload, NodeId, StructureResult};
use tracing::trace;

use crate::graph::StructureGraph;
use crate::scope::Scope;

/// Implemented links of one instance, split by whether they cross its boundary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkClassification {
    /// Both endpoints belong to the instance
    pub internal: BTreeMap<LinkId, LinkEnds>,
    /// Exactly one endpoint belongs to the instance
    pub edge: BTreeMap<LinkId, LinkEnds>,
}

impl LinkClassification {
    /// Edge links touching `mirror`
    pub fn edge_links_of(&self, mirror: MirrorId) -> impl Iterator<Item = &LinkEnds> + '_ {
        self.edge.values().filter(move |ends| ends.touches(mirror))
    }
}

impl<M: MirrorPayload> StructureGraph<M> {
    /// Bind `mirror` to `node`, returning any mirror bound before
    pub fn set_mirror(&mut self, node: NodeId, mirror: M) -> StructureResult<Option<M>> {
        self.node_or_err(node)?;
        let previous = self.mirrors.remove(&node);
        if let Some(old) = &previous {
            self.mirror_owners.remove(&old.mirror_id());
        }
        self.mirror_owners.insert(mirror.mirror_id(), node);
        trace!(%node, mirror = %mirror.mirror_id(), "mirror bound");
        self.mirrors.insert(node, mirror);
        Ok(previous)
    }

    /// Unbind and return the mirror of `node`
    pub fn take_mirror(&mut self, node: NodeId) -> Option<M> {
        let mirror = self.mirrors.remove(&node)?;
        self.mirror_owners.remove(&mirror.mirror_id());
        Some(mirror)
    }

    pub fn mirror(&self, node: NodeId) -> Option<&M> {
        self.mirrors.get(&node)
    }

    /// Mutable access to a bound mirror
    ///
    /// The mirror's id must not change while it is bound.
    pub fn mirror_mut(&mut self, node: NodeId) -> Option<&mut M> {
        self.mirrors.get_mut(&node)
    }

    /// Node the mirror is bound to
    pub fn owner_of(&self, mirror: MirrorId) -> Option<NodeId> {
        self.mirror_owners.get(&mirror).copied()
    }

    /// Links the mirror bound to `node` has implemented
    pub fn implemented_links(&self, node: NodeId) -> Vec<LinkEnds> {
        self.mirrors
            .get(&node)
            .map(MirrorPayload::implemented_links)
            .unwrap_or_default()
    }
}

impl<M: MirrorPayload> Scope<'_, M> {
    /// Whether any member has a mirror bound
    pub fn has_bound_members(&self) -> bool {
        self.members().iter().any(|id| self.graph.mirror(*id).is_some())
    }

    /// Split every member's implemented links into internal and edge links
    pub fn classify_links(&self) -> LinkClassification {
        let members = self.members();
        self.classify_links_within(&members)
    }

    pub(crate) fn classify_links_within(&self, members: &BTreeSet<NodeId>) -> LinkClassification {
        let in_scope = |mirror: MirrorId| {
            self.graph
                .owner_of(mirror)
                .map(|owner| members.contains(&owner))
                .unwrap_or(false)
        };

        let mut classification = LinkClassification::default();
        for id in members {
            for ends in self.graph.implemented_links(*id) {
                match (in_scope(ends.source), in_scope(ends.target)) {
                    (true, true) => {
                        classification.internal.insert(ends.link, ends);
                    }
                    (true, false) | (false, true) => {
                        classification.edge.insert(ends.link, ends);
                    }
                    (false, false) => {}
                }
            }
        }
        classification
    }

    /// Distinct internal links currently implemented
    pub fn implemented_link_count(&self) -> usize {
        self.classify_links().internal.len()
    }

    /// Links a complete instance of the head's shape plans for its members
    pub fn expected_total_link_count(&self) -> usize {
        let n = self.members().len();
        self.head_shape()
            .map(|shape| shape.planned_links(n))
            .unwrap_or_else(|| n.saturating_sub(1))
    }

    /// Planned links not yet implemented
    pub fn pending_links(&self) -> usize {
        self.expected_total_link_count()
            .saturating_sub(self.implemented_link_count())
    }

    /// Link-level consistency of the instance
    ///
    /// Holds when no implemented link is a self-link, every internal link
    /// joins two members adjacent in the plan, and edge links are carried
    /// only by the head or by boundary heads. When `require_head_boundary`
    /// is set and the head is bound and nested under a parent outside the
    /// instance, the head must carry at least one edge link. Instances with
    /// no bound member pass trivially.
    pub fn links_consistent(&self, require_head_boundary: bool) -> bool {
        let members = self.members();
        if !members.iter().any(|id| self.graph.mirror(*id).is_some()) {
            return true;
        }

        for id in &members {
            if self.graph.implemented_links(*id).iter().any(LinkEnds::is_self_link) {
                trace!(node = %id, "self link");
                return false;
            }
        }

        let classification = self.classify_links_within(&members);
        for ends in classification.internal.values() {
            let (Some(a), Some(b)) = (
                self.graph.owner_of(ends.source),
                self.graph.owner_of(ends.target),
            ) else {
                return false;
            };
            if !self.neighbors_within(a, &members).contains(&b) {
                trace!(link = %ends.link, from = %a, to = %b, "link outside the plan");
                return false;
            }
        }

        for ends in classification.edge.values() {
            let inside = [ends.source, ends.target]
                .into_iter()
                .filter_map(|mirror| self.graph.owner_of(mirror))
                .find(|owner| members.contains(owner));
            let Some(carrier) = inside else {
                return false;
            };
            if carrier != self.head() && !self.is_boundary(carrier) {
                trace!(link = %ends.link, node = %carrier, "edge link on an inner member");
                return false;
            }
        }

        let nested = self.graph.parent(self.head()).is_some_and(|parent| {
            !members.contains(&parent)
                && self
                    .graph
                    .node(parent)
                    .and_then(|record| record.edge_to(self.head()))
                    .is_some_and(|edge| !edge.is_tagged(self.structure_type(), self.head()))
        });
        if require_head_boundary && nested {
            if let Some(head_mirror) = self.graph.mirror(self.head()) {
                let head_mirror = head_mirror.mirror_id();
                if classification.edge_links_of(head_mirror).next().is_none() {
                    trace!(head = %self.head(), "nested head without boundary link");
                    return false;
                }
            }
        }
        true
    }
}
