//! Torus descriptor and coordinate arithmetic.

use super::id::{NodeId, Sign};
use super::ring::{DimensionKind, RingTopology};
use crate::error::TopologyError;

/// Ordered per-dimension extents of a ring (one dimension) or torus.
///
/// Created once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorusShape {
    extents: Vec<usize>,
    strides: Vec<usize>,
    nodes: usize,
}

impl TorusShape {
    pub fn new(extents: Vec<usize>) -> Result<Self, TopologyError> {
        if extents.is_empty() {
            return Err(TopologyError::NoDimensions);
        }
        if let Some(dim) = extents.iter().position(|&e| e == 0) {
            return Err(TopologyError::ZeroExtent { dim });
        }
        let mut strides = Vec::with_capacity(extents.len());
        let mut acc = 1usize;
        for &extent in &extents {
            strides.push(acc);
            acc = acc.saturating_mul(extent);
        }
        Ok(Self {
            extents,
            strides,
            nodes: acc,
        })
    }

    pub fn dims(&self) -> usize {
        self.extents.len()
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total node count (product of extents).
    pub fn len(&self) -> usize {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    pub fn max_extent(&self) -> usize {
        self.extents.iter().copied().max().unwrap_or(0)
    }

    pub fn extent(&self, dim: usize) -> Result<usize, TopologyError> {
        self.check_dim(dim)?;
        Ok(self.extents[dim])
    }

    pub fn check_dim(&self, dim: usize) -> Result<(), TopologyError> {
        if dim >= self.extents.len() {
            return Err(TopologyError::DimensionOutOfRange {
                dim,
                dims: self.extents.len(),
            });
        }
        Ok(())
    }

    pub fn check_node(&self, id: NodeId) -> Result<(), TopologyError> {
        if id.0 >= self.nodes {
            return Err(TopologyError::NodeOutOfRange {
                id,
                nodes: self.nodes,
            });
        }
        Ok(())
    }

    /// Mixed-radix decode.
    pub fn to_coordinates(&self, id: NodeId) -> Result<Vec<usize>, TopologyError> {
        self.check_node(id)?;
        let mut rest = id.0;
        let mut coords = Vec::with_capacity(self.extents.len());
        for &extent in &self.extents {
            coords.push(rest % extent);
            rest /= extent;
        }
        Ok(coords)
    }

    /// Mixed-radix encode.
    pub fn to_id(&self, coords: &[usize]) -> Result<NodeId, TopologyError> {
        if coords.len() != self.extents.len() {
            return Err(TopologyError::CoordinateArity {
                got: coords.len(),
                dims: self.extents.len(),
            });
        }
        let mut id = 0usize;
        for (dim, (&value, &extent)) in coords.iter().zip(&self.extents).enumerate() {
            if value >= extent {
                return Err(TopologyError::CoordinateOutOfRange { dim, value, extent });
            }
            id += value * self.strides[dim];
        }
        Ok(NodeId(id))
    }

    pub fn coordinate(&self, id: NodeId, dim: usize) -> Result<usize, TopologyError> {
        self.check_node(id)?;
        self.check_dim(dim)?;
        Ok((id.0 / self.strides[dim]) % self.extents[dim])
    }

    /// One hop along `dim` with wraparound.
    pub fn neighbor(&self, id: NodeId, dim: usize, sign: Sign) -> Result<NodeId, TopologyError> {
        self.neighbor_at(id, dim, sign, 1)
    }

    /// `hops` steps along `dim` with wraparound.
    pub fn neighbor_at(
        &self,
        id: NodeId,
        dim: usize,
        sign: Sign,
        hops: usize,
    ) -> Result<NodeId, TopologyError> {
        let x = self.coordinate(id, dim)?;
        let extent = self.extents[dim];
        let hops = hops % extent;
        let next = match sign {
            Sign::Positive => (x + hops) % extent,
            Sign::Negative => (x + extent - hops) % extent,
        };
        Ok(NodeId(id.0 - x * self.strides[dim] + next * self.strides[dim]))
    }

    /// Hop counts from `from` to `to` along `dim` going positive and negative.
    pub fn ring_distances(
        &self,
        from: NodeId,
        to: NodeId,
        dim: usize,
    ) -> Result<(usize, usize), TopologyError> {
        let a = self.coordinate(from, dim)?;
        let b = self.coordinate(to, dim)?;
        let extent = self.extents[dim];
        let pos = (b + extent - a) % extent;
        let neg = (a + extent - b) % extent;
        Ok((pos, neg))
    }

    /// Dimensions in which the two nodes' coordinates differ.
    pub fn differing_dims(&self, a: NodeId, b: NodeId) -> Result<Vec<usize>, TopologyError> {
        let ca = self.to_coordinates(a)?;
        let cb = self.to_coordinates(b)?;
        Ok((0..self.dims()).filter(|&d| ca[d] != cb[d]).collect())
    }

    /// Logical ring through `id` along `dim`.
    pub fn ring(&self, id: NodeId, dim: usize) -> Result<RingTopology, TopologyError> {
        let index = self.coordinate(id, dim)?;
        Ok(RingTopology::new(
            DimensionKind::from_index(dim),
            dim,
            id,
            self.extents[dim],
            index,
            self.strides[dim],
        ))
    }

    /// All ring members through `id` along `dim`, in coordinate order.
    pub fn members(&self, id: NodeId, dim: usize) -> Result<Vec<NodeId>, TopologyError> {
        let x = self.coordinate(id, dim)?;
        let base = id.0 - x * self.strides[dim];
        Ok((0..self.extents[dim])
            .map(|i| NodeId(base + i * self.strides[dim]))
            .collect())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes).map(NodeId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_round_trip_for_mixed_extents() {
        for extents in [vec![5], vec![4, 3], vec![2, 3, 4], vec![3, 1, 2, 2]] {
            let shape = TorusShape::new(extents.clone()).unwrap();
            for id in shape.node_ids() {
                let coords = shape.to_coordinates(id).unwrap();
                assert_eq!(shape.to_id(&coords).unwrap(), id, "extents {extents:?}");
            }
        }
    }

    #[test]
    fn zero_extent_is_rejected() {
        assert_eq!(
            TorusShape::new(vec![4, 0, 2]).unwrap_err(),
            TopologyError::ZeroExtent { dim: 1 }
        );
        assert_eq!(
            TorusShape::new(vec![]).unwrap_err(),
            TopologyError::NoDimensions
        );
    }

    #[test]
    fn neighbor_wraps_around() {
        let shape = TorusShape::new(vec![4, 3]).unwrap();
        // (3, 1) -> id 7
        let id = shape.to_id(&[3, 1]).unwrap();
        assert_eq!(id, NodeId(7));
        assert_eq!(shape.neighbor(id, 0, Sign::Positive).unwrap(), NodeId(4));
        assert_eq!(shape.neighbor(id, 0, Sign::Negative).unwrap(), NodeId(6));
        assert_eq!(shape.neighbor(id, 1, Sign::Positive).unwrap(), NodeId(11));
        let top = shape.to_id(&[3, 2]).unwrap();
        assert_eq!(shape.neighbor(top, 1, Sign::Positive).unwrap(), NodeId(3));
        assert!(shape.neighbor(id, 2, Sign::Positive).is_err());
    }

    #[test]
    fn members_follow_stride() {
        let shape = TorusShape::new(vec![2, 3, 2]).unwrap();
        assert_eq!(
            shape.members(NodeId(6), 1).unwrap(),
            vec![NodeId(6), NodeId(8), NodeId(10)]
        );
        assert_eq!(shape.ring_distances(NodeId(6), NodeId(10), 1).unwrap(), (2, 1));
    }
}
