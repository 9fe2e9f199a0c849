//! Per-dimension logical ring view of a torus node.

use serde::{Deserialize, Serialize};

use super::id::NodeId;

/// Which physical dimension a ring belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    Local,
    Vertical,
    Horizontal,
    Deep,
    Other(usize),
}

impl DimensionKind {
    pub fn from_index(dim: usize) -> Self {
        match dim {
            0 => Self::Local,
            1 => Self::Vertical,
            2 => Self::Horizontal,
            3 => Self::Deep,
            d => Self::Other(d),
        }
    }
}

/// Direction data flows around a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingDirection {
    /// Receiver is the next coordinate (+1).
    #[default]
    Clockwise,
    Anticlockwise,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingTopology {
    pub kind: DimensionKind,
    pub dim: usize,
    pub id: NodeId,
    nodes_in_ring: usize,
    index_in_ring: usize,
    offset: usize,
}

impl RingTopology {
    pub fn new(
        kind: DimensionKind,
        dim: usize,
        id: NodeId,
        nodes_in_ring: usize,
        index_in_ring: usize,
        offset: usize,
    ) -> Self {
        Self {
            kind,
            dim,
            id,
            nodes_in_ring,
            index_in_ring,
            offset,
        }
    }

    pub fn nodes_in_ring(&self) -> usize {
        self.nodes_in_ring
    }

    pub fn index_in_ring(&self) -> usize {
        self.index_in_ring
    }

    /// Id distance between ring neighbours (the dimension stride).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Boost mode keeps only rings whose first member is node 0.
    pub fn is_enabled(&self) -> bool {
        self.id.0 == self.index_in_ring * self.offset
    }

    fn at_index(&self, index: usize) -> NodeId {
        let base = self.id.0 - self.index_in_ring * self.offset;
        NodeId(base + index * self.offset)
    }

    /// Node `hops` positions downstream of this one.
    pub fn receiver_at(&self, hops: usize, direction: RingDirection) -> NodeId {
        let n = self.nodes_in_ring;
        let hops = hops % n;
        let index = match direction {
            RingDirection::Clockwise => (self.index_in_ring + hops) % n,
            RingDirection::Anticlockwise => (self.index_in_ring + n - hops) % n,
        };
        self.at_index(index)
    }

    /// Node `hops` positions upstream of this one.
    pub fn sender_at(&self, hops: usize, direction: RingDirection) -> NodeId {
        let opposite = match direction {
            RingDirection::Clockwise => RingDirection::Anticlockwise,
            RingDirection::Anticlockwise => RingDirection::Clockwise,
        };
        self.receiver_at(hops, opposite)
    }

    pub fn receiver(&self, direction: RingDirection) -> NodeId {
        self.receiver_at(1, direction)
    }

    pub fn sender(&self, direction: RingDirection) -> NodeId {
        self.sender_at(1, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topo::TorusShape;

    #[test]
    fn ring_neighbours_in_second_dimension() {
        let shape = TorusShape::new(vec![3, 4]).unwrap();
        // (1, 3) -> 10
        let ring = shape.ring(NodeId(10), 1).unwrap();
        assert_eq!(ring.kind, DimensionKind::Vertical);
        assert_eq!(ring.nodes_in_ring(), 4);
        assert_eq!(ring.index_in_ring(), 3);
        assert_eq!(ring.receiver(RingDirection::Clockwise), NodeId(1));
        assert_eq!(ring.sender(RingDirection::Clockwise), NodeId(7));
        assert_eq!(ring.receiver(RingDirection::Anticlockwise), NodeId(7));
        assert_eq!(ring.receiver_at(2, RingDirection::Clockwise), NodeId(4));
        assert_eq!(ring.sender_at(4, RingDirection::Clockwise), NodeId(10));
        assert!(!ring.is_enabled());
        assert!(shape.ring(NodeId(9), 1).unwrap().is_enabled());
    }
}
