//! Mirror topologies built on the structure model
//!
//! A [`Topology`] is one structure instance whose every member carries a
//! [`Mirror`]. It knows how to grow and shrink the instance while keeping
//! its shape, and how to walk the links the shape plans through their
//! lifecycle:
//! - Tree family (Tree, Line, Balanced, Depth-limited): attach under the
//!   shallowest member that accepts another child
//! - Ring: splice in before the head, splice out by joining the neighbours
//! - Star: new spokes hang off the center
//! - Fully connected: the newcomer links to every member
//! - N-connected: the whole instance is rewired as a circulant graph

use std::collections::{BTreeMap, BTreeSet};

use mirrorsim_core::{
    LinkEnds, LinkId, MirrorId, MirrorPayload, NodeId, StructureError, StructureResult,
    StructureType,
};
use mirrorsim_structure::variants::connected::required_degree;
use mirrorsim_structure::variants::ring::MIN_RING_SIZE;
use mirrorsim_structure::variants::star::MIN_STAR_SIZE;
use mirrorsim_structure::{EdgeChange, Shape, StructureGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{SimResult, SimulationError};
use crate::types::{Link, LinkState, Mirror, RejectReason};

/// Shape of a topology, with its parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TopologySpec {
    #[default]
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

impl TopologySpec {
    /// Shape every member takes, with its parameters checked
    pub fn shape(&self) -> StructureResult<Shape> {
        match *self {
            TopologySpec::Tree => Ok(Shape::Tree),
            TopologySpec::Line => Ok(Shape::Line),
            TopologySpec::BalancedTree {
                target_links_per_node,
                max_deviation,
            } => Shape::balanced_tree(target_links_per_node, max_deviation),
            TopologySpec::DepthLimitedTree { max_depth } => Shape::depth_limited_tree(max_depth),
            TopologySpec::Ring => Ok(Shape::Ring),
            TopologySpec::Star => Ok(Shape::Star),
            TopologySpec::FullyConnected => Ok(Shape::FullyConnected),
            TopologySpec::NConnected { degree } => Shape::n_connected(degree),
        }
    }

    pub fn structure_type(&self) -> StructureType {
        match self {
            TopologySpec::Tree => StructureType::Tree,
            TopologySpec::Line => StructureType::Line,
            TopologySpec::BalancedTree { .. } => StructureType::BalancedTree,
            TopologySpec::DepthLimitedTree { .. } => StructureType::DepthLimitedTree,
            TopologySpec::Ring => StructureType::Ring,
            TopologySpec::Star => StructureType::Star,
            TopologySpec::FullyConnected => StructureType::FullyConnected,
            TopologySpec::NConnected { .. } => StructureType::NConnected,
        }
    }

    /// Fewest mirrors a valid instance of this shape has
    pub fn min_mirrors(&self) -> usize {
        match self {
            TopologySpec::Ring => MIN_RING_SIZE,
            TopologySpec::Star => MIN_STAR_SIZE,
            _ => 1,
        }
    }

    fn is_tree_family(&self) -> bool {
        matches!(
            self,
            TopologySpec::Tree
                | TopologySpec::Line
                | TopologySpec::BalancedTree { .. }
                | TopologySpec::DepthLimitedTree { .. }
        )
    }
}

/// Outcome of a grow or shrink attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// `node` joined or left; `retired` links no longer matched the plan
    Applied { node: NodeId, retired: Vec<LinkId> },
    /// Nothing changed
    Rejected(RejectReason),
}

/// Links that moved during [`Topology::advance_links`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkProgress {
    pub opened: Vec<LinkId>,
    pub closed: Vec<LinkId>,
}

/// One structure instance with a mirror bound to every member
#[derive(Debug, Clone)]
pub struct Topology {
    spec: TopologySpec,
    shape: Shape,
    head: NodeId,
    /// Preferred children per member when growing a Tree or Depth-limited tree
    fanout: usize,
    graph: StructureGraph<Mirror>,
    next_link: u64,
}

impl Topology {
    /// Empty topology holding only its head
    fn with_head(spec: TopologySpec, fanout: usize) -> SimResult<Self> {
        let shape = spec.shape()?;
        let head = NodeId(1);
        let mut topology = Self {
            spec,
            shape,
            head,
            fanout: fanout.max(1),
            graph: StructureGraph::new(),
            next_link: 1,
        };
        topology.insert_member(head)?;
        topology.graph.set_head(head, spec.structure_type(), true)?;
        Ok(topology)
    }

    /// Build a topology from an explicit edge list; node `head` heads it
    ///
    /// Edges are attached in order, so every owner must already hang below
    /// the head when its edge is added.
    pub fn from_edges(spec: TopologySpec, head: u32, edges: &[(u32, u32)]) -> SimResult<Self> {
        let shape = spec.shape()?;
        let mut topology = Self {
            spec,
            shape,
            head: NodeId(head),
            fanout: 2,
            graph: StructureGraph::new(),
            next_link: 1,
        };
        let ids: BTreeSet<u32> = std::iter::once(head)
            .chain(edges.iter().flat_map(|(a, b)| [*a, *b]))
            .collect();
        for id in ids {
            topology.insert_member(NodeId(id))?;
        }
        topology
            .graph
            .set_head(topology.head, spec.structure_type(), true)?;
        for (owner, child) in edges {
            topology.attach(NodeId(*owner), NodeId(*child))?;
        }
        Ok(topology)
    }

    pub fn spec(&self) -> TopologySpec {
        self.spec
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn structure_type(&self) -> StructureType {
        self.spec.structure_type()
    }

    /// The underlying structure graph
    pub fn graph(&self) -> &StructureGraph<Mirror> {
        &self.graph
    }

    pub fn members(&self) -> BTreeSet<NodeId> {
        self.graph.all_nodes_in_structure(self.structure_type(), self.head)
    }

    pub fn mirror_count(&self) -> usize {
        self.members().len()
    }

    pub fn is_valid(&self) -> bool {
        self.graph.is_valid_instance(self.structure_type(), self.head)
    }

    /// Links a complete instance plans
    pub fn expected_links(&self) -> usize {
        self.graph
            .scope(self.structure_type(), self.head)
            .expected_total_link_count()
    }

    pub fn implemented_links(&self) -> usize {
        self.graph
            .scope(self.structure_type(), self.head)
            .implemented_link_count()
    }

    pub fn pending_links(&self) -> usize {
        self.graph.scope(self.structure_type(), self.head).pending_links()
    }

    /// Insert `id` with the topology's shape and bind a fresh mirror to it
    fn insert_member(&mut self, id: NodeId) -> SimResult<()> {
        self.graph.insert_node(id, self.shape)?;
        self.graph.set_mirror(id, Mirror::new(MirrorId(id.get())))?;
        Ok(())
    }

    fn new_member(&mut self) -> SimResult<NodeId> {
        let id = self.graph.next_free_id();
        self.insert_member(id)?;
        Ok(id)
    }

    /// Attach `owner -> child`, treating a full owner as an error
    fn attach(&mut self, owner: NodeId, child: NodeId) -> SimResult<()> {
        match self.graph.attach_child(owner, child)? {
            EdgeChange::AtCapacity => Err(SimulationError::Config(format!(
                "{owner} is at its child limit, cannot attach {child}"
            ))),
            _ => Ok(()),
        }
    }

    /// Add one mirror, keeping the shape
    ///
    /// The change is applied to the live structure and kept only when the
    /// instance still validates afterwards.
    pub fn grow(&mut self) -> SimResult<Change> {
        self.transaction(|topology| match topology.spec {
            TopologySpec::Ring => topology.grow_ring(),
            TopologySpec::Star => topology.grow_star(),
            TopologySpec::FullyConnected => topology.grow_fully_connected(),
            TopologySpec::NConnected { degree } => topology.grow_n_connected(degree),
            _ => topology.grow_tree(),
        })
    }

    /// Remove the mirror at `node`, keeping the shape
    pub fn shrink(&mut self, node: NodeId) -> SimResult<Change> {
        let ty = self.structure_type();
        if node == self.head || !self.graph.can_be_removed_from_structure(node, ty, self.head) {
            debug!(%node, %ty, "removal refused");
            return Ok(Change::Rejected(RejectReason::RemovalRefused));
        }
        self.transaction(|topology| {
            match topology.spec {
                TopologySpec::Ring => topology.splice_out(node)?,
                TopologySpec::NConnected { degree } => {
                    topology.graph.remove_node(node)?;
                    let order = topology.circulant_order();
                    if !topology.rewire_circulant(&order, degree)? {
                        return Ok(None);
                    }
                }
                _ => {
                    topology.graph.remove_node(node)?;
                    topology.rehome_orphans()?;
                }
            }
            Ok(Some(node))
        })
    }

    /// Apply `change`, then keep it only if the instance validates
    fn transaction<F>(&mut self, change: F) -> SimResult<Change>
    where
        F: FnOnce(&mut Self) -> SimResult<Option<NodeId>>,
    {
        let snapshot = self.graph.clone();
        let outcome = change(self).and_then(|node| match node {
            Some(node) => Ok(Some((node, self.retire_stale_links()?))),
            None => Ok(None),
        });
        match outcome {
            Ok(Some((node, retired))) if self.is_valid() => Ok(Change::Applied { node, retired }),
            Ok(Some((node, _))) => {
                debug!(%node, ty = %self.structure_type(), "change left an invalid instance, undone");
                self.graph = snapshot;
                Ok(Change::Rejected(RejectReason::InvalidResult))
            }
            Ok(None) => {
                self.graph = snapshot;
                Ok(Change::Rejected(RejectReason::NoCapacity))
            }
            Err(err) => {
                self.graph = snapshot;
                Err(err)
            }
        }
    }

    /// Shallowest member that accepts a child, preferring ones below the fan-out
    fn pick_parent(&self) -> Option<NodeId> {
        let ty = self.structure_type();
        let scope = self.graph.scope(ty, self.head);
        let mut candidates: Vec<(usize, NodeId)> = scope
            .depths()
            .into_iter()
            .filter(|(id, _)| self.graph.can_accept_more_children(*id, ty))
            .map(|(id, depth)| (depth, id))
            .collect();
        candidates.sort();
        let preferred = match self.spec {
            TopologySpec::BalancedTree {
                target_links_per_node,
                ..
            } => target_links_per_node,
            _ => self.fanout,
        };
        candidates
            .iter()
            .find(|(_, id)| scope.child_count(*id) < preferred)
            .or(candidates.first())
            .map(|(_, id)| *id)
    }

    fn grow_tree(&mut self) -> SimResult<Option<NodeId>> {
        let Some(parent) = self.pick_parent() else {
            return Ok(None);
        };
        let node = self.new_member()?;
        self.attach(parent, node)?;
        trace!(%parent, %node, "tree grew");
        Ok(Some(node))
    }

    fn grow_star(&mut self) -> SimResult<Option<NodeId>> {
        if !self.graph.can_accept_more_children(self.head, StructureType::Star) {
            return Ok(None);
        }
        let node = self.new_member()?;
        self.attach(self.head, node)?;
        Ok(Some(node))
    }

    /// Open the ring between its tail and the head, then close it through
    /// a new member
    fn grow_ring(&mut self) -> SimResult<Option<NodeId>> {
        let scope = self.graph.scope(StructureType::Ring, self.head);
        let members = scope.members();
        let Some(tail) = scope.tagged_parents(self.head).find(|p| members.contains(p)) else {
            return Ok(None);
        };
        self.graph.disconnect(tail, self.head)?;
        if !self.graph.can_accept_more_children(tail, StructureType::Ring) {
            return Ok(None);
        }
        let node = self.new_member()?;
        self.attach(tail, node)?;
        self.attach(node, self.head)?;
        trace!(%tail, %node, "spliced into ring");
        Ok(Some(node))
    }

    /// Join the neighbours of `node` and drop it
    fn splice_out(&mut self, node: NodeId) -> SimResult<()> {
        let scope = self.graph.scope(StructureType::Ring, self.head);
        let members = scope.members();
        let prev = scope.tagged_parents(node).find(|p| members.contains(p));
        let next = scope.tagged_children(node).find(|c| members.contains(c));
        let (Some(prev), Some(next)) = (prev, next) else {
            return Err(StructureError::MissingEdge {
                owner: node,
                child: node,
            }
            .into());
        };
        self.graph.remove_node(node)?;
        self.attach(prev, next)?;
        trace!(%prev, %node, %next, "spliced out of ring");
        Ok(())
    }

    fn grow_fully_connected(&mut self) -> SimResult<Option<NodeId>> {
        if !self
            .graph
            .can_accept_more_children(self.head, StructureType::FullyConnected)
        {
            return Ok(None);
        }
        let existing = self.circulant_order();
        let node = self.new_member()?;
        for owner in existing {
            self.attach(owner, node)?;
        }
        Ok(Some(node))
    }

    fn grow_n_connected(&mut self, degree: usize) -> SimResult<Option<NodeId>> {
        let mut order = self.circulant_order();
        if circulant_pairs(order.len() + 1, degree).is_none() {
            debug!(degree, mirrors = order.len() + 1, "degree not reachable at this size");
            return Ok(None);
        }
        let node = self.new_member()?;
        order.push(node);
        if !self.rewire_circulant(&order, degree)? {
            return Ok(None);
        }
        Ok(Some(node))
    }

    /// Head first, then the other members by id
    fn circulant_order(&self) -> Vec<NodeId> {
        std::iter::once(self.head)
            .chain(self.members().into_iter().filter(|id| *id != self.head))
            .collect()
    }

    /// Replace every edge among `order` with the circulant pattern
    ///
    /// Edges always point from the earlier to the later position, so parent
    /// chains run back to the head. Returns false when the degree cannot be
    /// met by `order.len()` members.
    fn rewire_circulant(&mut self, order: &[NodeId], degree: usize) -> SimResult<bool> {
        let Some(pairs) = circulant_pairs(order.len(), degree) else {
            return Ok(false);
        };
        let in_order: BTreeSet<NodeId> = order.iter().copied().collect();
        for owner in order {
            let children: Vec<NodeId> = self
                .graph
                .node(*owner)
                .map(|n| n.child_ids().filter(|c| in_order.contains(c)).collect())
                .unwrap_or_default();
            for child in children {
                self.graph.disconnect(*owner, child)?;
            }
        }

        let mut by_child: Vec<(usize, usize)> = pairs.into_iter().map(|(i, j)| (j, i)).collect();
        by_child.sort();
        for (j, i) in by_child {
            self.attach(order[i], order[j])?;
        }
        trace!(mirrors = order.len(), degree, "rewired circulant");
        Ok(true)
    }

    /// Give every parentless non-head member a parent among its owners
    fn rehome_orphans(&mut self) -> SimResult<()> {
        let orphans: Vec<NodeId> = self
            .graph
            .node_ids()
            .into_iter()
            .filter(|id| *id != self.head && self.graph.parent(*id).is_none())
            .collect();
        for orphan in orphans {
            let first_owner = self.graph.incoming(orphan).next();
            if let Some(owner) = first_owner {
                self.graph.reparent(orphan, owner)?;
                trace!(%orphan, %owner, "re-homed");
            }
        }
        Ok(())
    }

    /// Planned `(owner, child)` pairs of the instance
    pub fn planned_pairs(&self) -> Vec<(NodeId, NodeId)> {
        let scope = self.graph.scope(self.structure_type(), self.head);
        let members = scope.members();
        members
            .iter()
            .flat_map(|owner| {
                scope
                    .tagged_children(*owner)
                    .filter(|child| members.contains(child))
                    .map(move |child| (*owner, child))
            })
            .collect()
    }

    /// Planned pairs with no live link yet
    pub fn pending_pairs(&self) -> Vec<(NodeId, NodeId)> {
        self.planned_pairs()
            .into_iter()
            .filter(|(a, b)| {
                let target = MirrorId(b.get());
                self.graph
                    .mirror(*a)
                    .is_none_or(|mirror| mirror.live_link_to(target).is_none())
            })
            .collect()
    }

    /// Every link copy held by a bound mirror, one entry per link
    pub fn links(&self) -> BTreeMap<LinkId, Link> {
        let mut links = BTreeMap::new();
        for id in self.graph.node_ids() {
            if let Some(mirror) = self.graph.mirror(id) {
                for link in mirror.links.values() {
                    links.entry(link.id).or_insert_with(|| link.clone());
                }
            }
        }
        links
    }

    pub fn link(&self, id: LinkId) -> Option<Link> {
        self.links().remove(&id)
    }

    /// Start opening a link for the planned pair `owner -> child`
    pub fn request_link(&mut self, owner: NodeId, child: NodeId, tick: u64) -> SimResult<LinkId> {
        let source = self
            .graph
            .mirror(owner)
            .map(MirrorPayload::mirror_id)
            .ok_or(StructureError::UnknownNode(owner))?;
        let target = self
            .graph
            .mirror(child)
            .map(MirrorPayload::mirror_id)
            .ok_or(StructureError::UnknownNode(child))?;

        let id = LinkId(self.next_link);
        self.next_link += 1;
        let mut link = Link::new(id, source, target, tick);
        link.transition(LinkState::Opening)?;
        for node in [owner, child] {
            if let Some(mirror) = self.graph.mirror_mut(node) {
                mirror.links.insert(id, link.clone());
            }
        }
        trace!(link = %id, %source, %target, "link requested");
        Ok(id)
    }

    /// Move both copies of a link to `next`
    fn update_link(&mut self, ends: LinkEnds, next: LinkState) -> SimResult<()> {
        let mut found = false;
        for mirror in [ends.source, ends.target] {
            let Some(node) = self.graph.owner_of(mirror) else {
                continue;
            };
            if let Some(link) = self
                .graph
                .mirror_mut(node)
                .and_then(|m| m.links.get_mut(&ends.link))
            {
                link.transition(next)?;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(SimulationError::UnknownLink(ends.link))
        }
    }

    fn drop_link(&mut self, ends: LinkEnds) {
        for mirror in [ends.source, ends.target] {
            if let Some(node) = self.graph.owner_of(mirror) {
                if let Some(m) = self.graph.mirror_mut(node) {
                    m.links.remove(&ends.link);
                }
            }
        }
    }

    /// Begin tearing down an open link
    pub fn close_link(&mut self, id: LinkId) -> SimResult<()> {
        let link = self.link(id).ok_or(SimulationError::UnknownLink(id))?;
        self.update_link(link.ends(), LinkState::Closing)
    }

    /// Finish handshakes: opening links open, closing links close and go away
    pub fn advance_links(&mut self) -> SimResult<LinkProgress> {
        let mut progress = LinkProgress::default();
        for link in self.links().into_values() {
            match link.state {
                LinkState::Opening => {
                    self.update_link(link.ends(), LinkState::Open)?;
                    progress.opened.push(link.id);
                }
                LinkState::Closing => {
                    self.update_link(link.ends(), LinkState::Closed)?;
                    self.drop_link(link.ends());
                    progress.closed.push(link.id);
                }
                _ => {}
            }
        }
        Ok(progress)
    }

    /// Request every pending link and complete the handshakes
    pub fn open_all_planned(&mut self, tick: u64) -> SimResult<usize> {
        let pending = self.pending_pairs();
        for (owner, child) in &pending {
            self.request_link(*owner, *child, tick)?;
        }
        Ok(self.advance_links()?.opened.len())
    }

    /// Close and drop links whose endpoints are no longer adjacent members
    fn retire_stale_links(&mut self) -> SimResult<Vec<LinkId>> {
        let scope = self.graph.scope(self.structure_type(), self.head);
        let members = scope.members();
        let stale: BTreeSet<LinkId> = self
            .links()
            .into_values()
            .filter(|link| {
                let owners = (
                    self.graph.owner_of(link.source),
                    self.graph.owner_of(link.target),
                );
                match owners {
                    (Some(a), Some(b)) => {
                        !members.contains(&a) || !scope.neighbors_within(a, &members).contains(&b)
                    }
                    _ => true,
                }
            })
            .map(|link| link.id)
            .collect();
        if stale.is_empty() {
            return Ok(Vec::new());
        }

        for node in self.graph.node_ids() {
            let Some(mirror) = self.graph.mirror_mut(node) else {
                continue;
            };
            for id in &stale {
                if let Some(mut link) = mirror.links.remove(id) {
                    force_close(&mut link)?;
                }
            }
        }
        debug!(count = stale.len(), "retired links outside the plan");
        Ok(stale.into_iter().collect())
    }

    /// Shape-specific figures for display
    pub fn analytics(&self) -> Vec<(String, String)> {
        let ty = self.structure_type();
        let scope = self.graph.scope(ty, self.head);
        let mut rows = vec![
            ("valid".to_string(), self.is_valid().to_string()),
            ("mirrors".to_string(), scope.members().len().to_string()),
            (
                "planned links".to_string(),
                scope.expected_total_link_count().to_string(),
            ),
            (
                "open links".to_string(),
                scope.implemented_link_count().to_string(),
            ),
        ];
        match self.spec {
            TopologySpec::BalancedTree { .. } => {
                if let Ok(score) = self.graph.balance_score(ty, self.head) {
                    rows.push(("balance score".to_string(), format!("{score:.3}")));
                }
                rows.push(("height".to_string(), scope.tree_height().to_string()));
            }
            spec if spec.is_tree_family() => {
                rows.push(("height".to_string(), scope.tree_height().to_string()));
            }
            TopologySpec::FullyConnected => {
                rows.push((
                    "density".to_string(),
                    format!("{:.3}", scope.connectivity_density()),
                ));
            }
            TopologySpec::NConnected { .. } => {
                rows.push((
                    "fault tolerant".to_string(),
                    scope.is_fault_tolerant().to_string(),
                ));
            }
            _ => {}
        }
        rows
    }

    /// Print a simple ASCII visualization of the topology
    pub fn visualize(&self) -> String {
        let scope = self.graph.scope(self.structure_type(), self.head);
        let members = scope.members();
        let mut output = format!("Topology: {} (head {})\n", self.structure_type(), self.head);
        for (label, value) in self.analytics() {
            output.push_str(&format!("  {label}: {value}\n"));
        }
        output.push('\n');
        for id in &members {
            let children: Vec<String> = scope
                .tagged_children(*id)
                .filter(|c| members.contains(c))
                .map(|c| c.to_string())
                .collect();
            output.push_str(&format!("  {} -> [{}]\n", id, children.join(", ")));
        }
        output
    }
}

/// Drive a link to `Closed` through the legal steps
fn force_close(link: &mut Link) -> SimResult<()> {
    match link.state {
        LinkState::Opening | LinkState::Open => {
            link.transition(LinkState::Closing)?;
            link.transition(LinkState::Closed)
        }
        LinkState::Planned | LinkState::Closing => link.transition(LinkState::Closed),
        LinkState::Closed => Ok(()),
    }
}

/// Index pairs `(i, j)`, `i < j`, of a circulant graph on `n` positions
/// where every position has `min(degree, n - 1)` neighbours
///
/// `None` when that degree is odd and `n` is odd, which no graph meets.
fn circulant_pairs(n: usize, degree: usize) -> Option<BTreeSet<(usize, usize)>> {
    let required = required_degree(degree, n);
    let mut pairs = BTreeSet::new();
    if required + 1 == n || n < 2 {
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.insert((i, j));
            }
        }
        return Some(pairs);
    }
    if required % 2 == 1 && n % 2 == 1 {
        return None;
    }
    for i in 0..n {
        for offset in 1..=required / 2 {
            let j = (i + offset) % n;
            pairs.insert((i.min(j), i.max(j)));
        }
        if required % 2 == 1 {
            let j = (i + n / 2) % n;
            pairs.insert((i.min(j), i.max(j)));
        }
    }
    Some(pairs)
}

/// Builder for creating topologies of a given shape
pub struct TopologyBuilder {
    mirrors: usize,
    fanout: usize,
}

impl TopologyBuilder {
    /// Create a builder for `mirrors` mirrors
    pub fn new(mirrors: usize) -> Self {
        Self { mirrors, fanout: 2 }
    }

    /// Preferred children per member for Tree and Depth-limited trees
    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn build(&self, spec: TopologySpec) -> SimResult<Topology> {
        if self.mirrors < spec.min_mirrors() {
            return Err(SimulationError::Config(format!(
                "{} needs at least {} mirrors, got {}",
                spec.structure_type(),
                spec.min_mirrors(),
                self.mirrors
            )));
        }
        let mut topology = Topology::with_head(spec, self.fanout)?;
        match spec {
            TopologySpec::Ring => self.ring(&mut topology)?,
            TopologySpec::FullyConnected => self.wired(&mut topology, self.mirrors.saturating_sub(1))?,
            TopologySpec::NConnected { degree } => self.wired(&mut topology, degree)?,
            _ => {
                for _ in 1..self.mirrors {
                    let node = match spec {
                        TopologySpec::Star => topology.grow_star()?,
                        _ => topology.grow_tree()?,
                    };
                    if node.is_none() {
                        return Err(SimulationError::Config(format!(
                            "{} stopped accepting mirrors at {}",
                            spec.structure_type(),
                            topology.mirror_count()
                        )));
                    }
                }
            }
        }
        debug!(
            ty = %spec.structure_type(),
            mirrors = topology.mirror_count(),
            valid = topology.is_valid(),
            "topology built"
        );
        Ok(topology)
    }

    /// head -> 2 -> ... -> n -> head
    fn ring(&self, topology: &mut Topology) -> SimResult<()> {
        let mut previous = topology.head;
        for _ in 1..self.mirrors {
            let node = topology.new_member()?;
            topology.attach(previous, node)?;
            previous = node;
        }
        topology.attach(previous, topology.head)
    }

    fn wired(&self, topology: &mut Topology, degree: usize) -> SimResult<()> {
        let mut order = vec![topology.head];
        for _ in 1..self.mirrors {
            order.push(topology.new_member()?);
        }
        if topology.rewire_circulant(&order, degree)? {
            Ok(())
        } else {
            Err(SimulationError::UnsatisfiableDegree {
                degree,
                mirrors: self.mirrors,
            })
        }
    }
}
