//! Temporary detach-and-restore probes
//!
//! Some analytics need to ask "what would the structure look like without
//! this node?". [`StructureGraph::with_detached`] answers that on the live
//! graph: it snapshots every record the detach will touch, performs the
//! detach, runs the probe, and restores the snapshot on every exit path,
//! including an error from the probe or a panic unwinding through it.
//!
//! The probe holds `&mut` access for its whole duration, so no other reader
//! can observe the intermediate state.

use std::collections::{BTreeMap, BTreeSet};

use mirrorsim_core::{NodeId, StructureError, StructureResult, StructureType};
use tracing::{debug, trace};

use crate::edge::TypedEdge;
use crate::graph::StructureGraph;
use crate::node::StructureNode;

/// Restores saved arena records when dropped
struct RestoreGuard<'g, M> {
    graph: &'g mut StructureGraph<M>,
    saved_nodes: Vec<(NodeId, Option<StructureNode>)>,
    saved_incoming: Vec<(NodeId, Option<BTreeSet<NodeId>>)>,
}

impl<'g, M> RestoreGuard<'g, M> {
    fn new(graph: &'g mut StructureGraph<M>, affected: &BTreeSet<NodeId>) -> Self {
        let saved_nodes = affected
            .iter()
            .map(|id| (*id, graph.nodes.get(id).cloned()))
            .collect();
        let saved_incoming = affected
            .iter()
            .map(|id| (*id, graph.incoming.get(id).cloned()))
            .collect();
        Self {
            graph,
            saved_nodes,
            saved_incoming,
        }
    }
}

impl<M> Drop for RestoreGuard<'_, M> {
    fn drop(&mut self) {
        for (id, record) in self.saved_nodes.drain(..) {
            match record {
                Some(node) => {
                    self.graph.nodes.insert(id, node);
                }
                None => {
                    self.graph.nodes.remove(&id);
                }
            }
        }
        for (id, owners) in self.saved_incoming.drain(..) {
            match owners {
                Some(owners) => {
                    self.graph.incoming.insert(id, owners);
                }
                None => {
                    self.graph.incoming.remove(&id);
                }
            }
        }
        trace!("probe state restored");
    }
}

impl<M> StructureGraph<M> {
    /// Run `probe` against the graph with `node` temporarily detached
    ///
    /// Children `node` reaches through `(ty, head)` edges are re-homed
    /// under `node`'s parent for the duration. Fails with
    /// [`StructureError::NoParent`] when `node` has no parent. The graph is
    /// restored exactly whether `probe` succeeds, fails or panics.
    pub fn with_detached<R>(
        &mut self,
        node: NodeId,
        ty: StructureType,
        head: NodeId,
        probe: impl FnOnce(&StructureGraph<M>) -> StructureResult<R>,
    ) -> StructureResult<R> {
        let record = self.node_or_err(node)?;
        let parent = record.parent().ok_or(StructureError::NoParent(node))?;

        let rehomed: Vec<TypedEdge> = record
            .children()
            .filter(|edge| edge.is_tagged(ty, head))
            .cloned()
            .collect();

        let mut affected: BTreeSet<NodeId> = BTreeSet::from([node, parent]);
        affected.extend(record.child_ids());
        affected.extend(self.incoming(node));

        let mut guard = RestoreGuard::new(self, &affected);
        debug!(%node, %parent, rehomed = rehomed.len(), "probing with node detached");

        guard.graph.detach_node(node)?;
        for edge in rehomed {
            let child = edge.child();
            let merged = match guard.graph.node_or_err(parent)?.edge_to(child) {
                Some(existing) => existing.merged(edge.heads()),
                None => TypedEdge::new(child, edge.heads().clone()),
            };
            guard.graph.node_mut_or_err(parent)?.put_edge(merged);
            guard.graph.incoming.entry(child).or_default().insert(parent);
            guard.graph.node_mut_or_err(child)?.set_parent(Some(parent));
        }

        probe(&*guard.graph)
    }

    /// Snapshot of every node record, for comparing before and after a probe
    pub fn fingerprint(&self) -> BTreeMap<NodeId, (Option<NodeId>, Vec<TypedEdge>)> {
        self.nodes
            .iter()
            .map(|(id, node)| (*id, (node.parent(), node.children().cloned().collect())))
            .collect()
    }
}
