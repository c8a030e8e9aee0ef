//! Fully-connected and N-connected policies
//!
//! Both are undirected in spirit: adjacency counts an edge in either
//! direction once. Parent links must still form chains that terminate.

use std::collections::BTreeSet;

use mirrorsim_core::{NodeId, StructureType};

use crate::graph::StructureGraph;
use crate::scope::Scope;

/// Degree every member of an `n`-member, degree-`degree` instance must have
pub fn required_degree(degree: usize, n: usize) -> usize {
    degree.min(n.saturating_sub(1))
}

pub(crate) fn is_valid_fully_connected<M>(scope: &Scope<'_, M>) -> bool {
    let members = scope.members();
    let n = members.len();
    if n == 0 {
        return false;
    }
    let complete = members.iter().all(|id| {
        let neighbours = scope.neighbors_within(*id, &members);
        neighbours.len() == n - 1 && neighbours.iter().all(|other| {
            scope.neighbors_within(*other, &members).contains(id)
        })
    });
    complete && scope.parent_chains_acyclic()
}

pub(crate) fn fully_connected_can_shrink<M>(scope: &Scope<'_, M>, node: NodeId) -> bool {
    node != scope.head() && scope.members().len() >= 3
}

pub(crate) fn is_valid_n_connected<M>(scope: &Scope<'_, M>, degree: usize) -> bool {
    let members = scope.members();
    if members.is_empty() {
        return false;
    }
    let required = required_degree(degree, members.len());
    members
        .iter()
        .all(|id| scope.neighbors_within(*id, &members).len() == required)
        && scope.is_connected_within(&members)
        && scope.parent_chains_acyclic()
}

pub(crate) fn n_connected_can_grow<M>(scope: &Scope<'_, M>, node: NodeId, degree: usize) -> bool {
    let members = scope.members();
    scope.neighbors_within(node, &members).len() < required_degree(degree, members.len())
}

pub(crate) fn n_connected_can_shrink<M>(scope: &Scope<'_, M>, node: NodeId, degree: usize) -> bool {
    node != scope.head() && scope.members().len() > degree + 1
}

impl<M> Scope<'_, M> {
    /// Distinct undirected edges over the `n(n - 1) / 2` possible pairs
    ///
    /// A single member is trivially complete.
    pub fn connectivity_density(&self) -> f64 {
        let n = self.members().len();
        if n < 2 {
            return 1.0;
        }
        let possible = n * (n - 1) / 2;
        self.undirected_edge_count() as f64 / possible as f64
    }

    /// Scoped neighbours of `node`
    pub fn connectivity_degree(&self, node: NodeId) -> usize {
        self.degree(node)
    }

    /// Whether dropping any single non-head member keeps the rest connected
    ///
    /// Works over copies of the member set; the graph is never touched.
    pub fn is_fault_tolerant(&self) -> bool {
        let members = self.members();
        members
            .iter()
            .filter(|id| **id != self.head())
            .all(|removed| {
                let remaining: BTreeSet<NodeId> =
                    members.iter().copied().filter(|id| id != removed).collect();
                self.is_connected_within(&remaining)
            })
    }

    /// Number of simple routes from the head to `target`
    pub fn route_redundancy(&self, target: NodeId) -> usize {
        self.all_paths_from_head(target).len()
    }
}

impl<M> StructureGraph<M> {
    /// Connectivity degree of `node` inside its nearest `ty` instance
    pub fn connectivity_degree(&self, node: NodeId, ty: StructureType) -> Option<usize> {
        let head = self.find_head(node, ty)?;
        Some(self.scope(ty, head).connectivity_degree(node))
    }

    pub fn is_fault_tolerant(&self, ty: StructureType, head: NodeId) -> bool {
        self.scope(ty, head).is_fault_tolerant()
    }
}
