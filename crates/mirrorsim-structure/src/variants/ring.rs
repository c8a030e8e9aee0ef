//! Ring policies
//!
//! A ring instance is one closed cycle through every member: each member has
//! exactly one scoped child and two distinct scoped neighbours.

use std::collections::BTreeSet;

use mirrorsim_core::{NodeId, StructureType};

use crate::graph::StructureGraph;
use crate::scope::Scope;

/// Smallest ring the validator accepts
pub const MIN_RING_SIZE: usize = 3;

pub(crate) fn is_valid<M>(scope: &Scope<'_, M>) -> bool {
    let members = scope.members();
    if members.len() < MIN_RING_SIZE {
        return false;
    }
    let regular = members.iter().all(|id| {
        scope.tagged_children(*id).filter(|c| members.contains(c)).count() == 1
            && scope.neighbors_within(*id, &members).len() == 2
    });
    regular && scope.forms_closed_cycle(&members)
}

pub(crate) fn can_grow<M>(scope: &Scope<'_, M>, node: NodeId) -> bool {
    scope.child_count(node) == 0
}

/// At least `MIN_RING_SIZE` members remain afterwards
pub(crate) fn can_shrink<M>(scope: &Scope<'_, M>, _node: NodeId) -> bool {
    scope.members().len() > MIN_RING_SIZE
}

impl<M> Scope<'_, M> {
    /// Steps from the head to `node` following scoped child edges
    pub fn ring_position(&self, node: NodeId) -> Option<usize> {
        let members = self.members();
        if !members.contains(&node) {
            return None;
        }
        let mut seen = BTreeSet::new();
        let mut current = self.head();
        let mut steps = 0;
        while seen.insert(current) {
            if current == node {
                return Some(steps);
            }
            current = self.tagged_children(current).find(|c| members.contains(c))?;
            steps += 1;
        }
        None
    }
}

impl<M> StructureGraph<M> {
    /// Position of `node` in the `ty` ring headed by its nearest head
    pub fn ring_position(&self, node: NodeId, ty: StructureType) -> Option<usize> {
        let head = self.find_head(node, ty)?;
        self.scope(ty, head).ring_position(node)
    }
}
