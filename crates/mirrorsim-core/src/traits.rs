//! The seam between structure nodes and simulated mirrors

use serde::{Deserialize, Serialize};

use crate::types::{LinkId, MirrorId};

/// Endpoints of one implemented link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEnds {
    pub link: LinkId,
    pub source: MirrorId,
    pub target: MirrorId,
}

impl LinkEnds {
    pub fn new(link: LinkId, source: MirrorId, target: MirrorId) -> Self {
        Self {
            link,
            source,
            target,
        }
    }

    /// A link whose source and target are the same mirror
    pub fn is_self_link(&self) -> bool {
        self.source == self.target
    }

    /// Whether `mirror` is one of the endpoints
    pub fn touches(&self, mirror: MirrorId) -> bool {
        self.source == mirror || self.target == mirror
    }

    /// The endpoint opposite to `mirror`, if `mirror` is an endpoint
    pub fn other(&self, mirror: MirrorId) -> Option<MirrorId> {
        if self.source == mirror {
            Some(self.target)
        } else if self.target == mirror {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Externally owned payload bound to a structure node
///
/// The structural layer never drives the payload; it only reads which
/// links are currently implemented so it can reconcile them against the
/// planned edges.
pub trait MirrorPayload {
    /// Identity of the mirror
    fn mirror_id(&self) -> MirrorId;

    /// Links this mirror currently has implemented (open)
    fn implemented_links(&self) -> Vec<LinkEnds>;
}

/// Payload type for graphs that never bind mirrors
///
/// Uninhabited, so a `StructureGraph<Unbound>` is statically mirror-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unbound {}

impl MirrorPayload for Unbound {
    fn mirror_id(&self) -> MirrorId {
        match *self {}
    }

    fn implemented_links(&self) -> Vec<LinkEnds> {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_ends_helpers() {
        let ends = LinkEnds::new(LinkId(1), MirrorId(2), MirrorId(3));
        assert!(!ends.is_self_link());
        assert!(ends.touches(MirrorId(3)));
        assert_eq!(ends.other(MirrorId(2)), Some(MirrorId(3)));
        assert_eq!(ends.other(MirrorId(9)), None);

        let looped = LinkEnds::new(LinkId(2), MirrorId(5), MirrorId(5));
        assert!(looped.is_self_link());
    }
}
