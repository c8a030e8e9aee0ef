//! Core types for the mirror simulation
//!
//! Mirrors are the runtime objects bound to structure nodes. Each mirror
//! holds the links it takes part in; a link walks a small lifecycle from
//! planned to closed and only counts as implemented while it is open.

use std::collections::BTreeMap;

use mirrorsim_core::{LinkEnds, LinkId, MirrorId, MirrorPayload, NodeId, StructureType};
use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};

/// Lifecycle of a link between two mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Wanted by the structure, nothing set up yet
    Planned,
    /// Handshake in progress
    Opening,
    /// Carrying traffic; the only implemented state
    Open,
    /// Tear-down in progress
    Closing,
    /// Gone
    Closed,
}

impl LinkState {
    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(self, next: LinkState) -> bool {
        use LinkState::*;
        matches!(
            (self, next),
            (Planned, Opening)
                | (Planned, Closed)
                | (Opening, Open)
                | (Opening, Closing)
                | (Open, Closing)
                | (Closing, Closed)
        )
    }

    pub fn is_implemented(self) -> bool {
        self == LinkState::Open
    }

    /// Planned, opening or open: the link still serves the plan
    pub fn is_live(self) -> bool {
        matches!(self, LinkState::Planned | LinkState::Opening | LinkState::Open)
    }
}

/// A link between two mirrors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: MirrorId,
    pub target: MirrorId,
    pub state: LinkState,
    /// Tick the link was created
    pub created_at: u64,
}

impl Link {
    pub fn new(id: LinkId, source: MirrorId, target: MirrorId, tick: u64) -> Self {
        Self {
            id,
            source,
            target,
            state: LinkState::Planned,
            created_at: tick,
        }
    }

    /// Move to `next`, rejecting illegal steps
    pub fn transition(&mut self, next: LinkState) -> SimResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SimulationError::InvalidTransition {
                link: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn ends(&self) -> LinkEnds {
        LinkEnds::new(self.id, self.source, self.target)
    }

    /// Whether the link joins `a` and `b`, in either direction
    pub fn joins(&self, a: MirrorId, b: MirrorId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// A simulated mirror and the links it takes part in
///
/// Both endpoints of a link keep their own copy, kept in step by the
/// topology that owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mirror {
    pub id: MirrorId,
    pub links: BTreeMap<LinkId, Link>,
}

impl Mirror {
    pub fn new(id: MirrorId) -> Self {
        Self {
            id,
            links: BTreeMap::new(),
        }
    }

    /// Live link to `other`, if any
    pub fn live_link_to(&self, other: MirrorId) -> Option<&Link> {
        self.links
            .values()
            .find(|link| link.state.is_live() && link.joins(self.id, other))
    }

    pub fn open_link_count(&self) -> usize {
        self.links.values().filter(|l| l.state.is_implemented()).count()
    }
}

impl MirrorPayload for Mirror {
    fn mirror_id(&self) -> MirrorId {
        self.id
    }

    fn implemented_links(&self) -> Vec<LinkEnds> {
        self.links
            .values()
            .filter(|link| link.state.is_implemented())
            .map(Link::ends)
            .collect()
    }
}

/// Why a topology change was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// No member can take another child
    NoCapacity,
    /// The member may not leave without breaking the shape
    RemovalRefused,
    /// The change was applied but left an invalid instance, so it was undone
    InvalidResult,
    /// The mirror ceiling from the configuration is reached
    MirrorLimit,
}

/// Events recorded by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    MirrorAdded {
        tick: u64,
        mirror: MirrorId,
        node: NodeId,
    },
    MirrorRemoved {
        tick: u64,
        mirror: MirrorId,
        node: NodeId,
    },
    ChangeRejected {
        tick: u64,
        node: Option<NodeId>,
        reason: RejectReason,
    },
    LinkRequested {
        tick: u64,
        link: LinkId,
        source: MirrorId,
        target: MirrorId,
    },
    LinkOpened {
        tick: u64,
        link: LinkId,
    },
    LinkClosing {
        tick: u64,
        link: LinkId,
    },
    LinkClosed {
        tick: u64,
        link: LinkId,
    },
    ValidationFailed {
        tick: u64,
        structure_type: StructureType,
        head: NodeId,
    },
}

impl SimEvent {
    /// Tick the event happened at
    pub fn tick(&self) -> u64 {
        match self {
            SimEvent::MirrorAdded { tick, .. }
            | SimEvent::MirrorRemoved { tick, .. }
            | SimEvent::ChangeRejected { tick, .. }
            | SimEvent::LinkRequested { tick, .. }
            | SimEvent::LinkOpened { tick, .. }
            | SimEvent::LinkClosing { tick, .. }
            | SimEvent::LinkClosed { tick, .. }
            | SimEvent::ValidationFailed { tick, .. } => *tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_lifecycle() {
        let mut link = Link::new(LinkId(1), MirrorId(1), MirrorId(2), 0);
        assert_eq!(link.state, LinkState::Planned);
        link.transition(LinkState::Opening).unwrap();
        link.transition(LinkState::Open).unwrap();
        assert!(link.state.is_implemented());
        link.transition(LinkState::Closing).unwrap();
        assert!(!link.state.is_live());
        link.transition(LinkState::Closed).unwrap();
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let mut link = Link::new(LinkId(4), MirrorId(1), MirrorId(2), 0);
        let err = link.transition(LinkState::Open).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidTransition {
                from: LinkState::Planned,
                to: LinkState::Open,
                ..
            }
        ));
        assert_eq!(link.state, LinkState::Planned);

        link.transition(LinkState::Closed).unwrap();
        assert!(link.transition(LinkState::Opening).is_err());
    }

    #[test]
    fn test_only_open_links_are_implemented() {
        let mut mirror = Mirror::new(MirrorId(1));
        let mut opening = Link::new(LinkId(1), MirrorId(1), MirrorId(2), 0);
        opening.transition(LinkState::Opening).unwrap();
        let mut open = Link::new(LinkId(2), MirrorId(3), MirrorId(1), 0);
        open.transition(LinkState::Opening).unwrap();
        open.transition(LinkState::Open).unwrap();
        mirror.links.insert(opening.id, opening);
        mirror.links.insert(open.id, open);

        let implemented = mirror.implemented_links();
        assert_eq!(implemented.len(), 1);
        assert_eq!(implemented[0].link, LinkId(2));
        assert_eq!(mirror.open_link_count(), 1);
        assert!(mirror.live_link_to(MirrorId(2)).is_some());
        assert!(mirror.live_link_to(MirrorId(3)).is_some());
        assert!(mirror.live_link_to(MirrorId(9)).is_none());
    }
}
