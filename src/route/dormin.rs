//! Dimension-order minimal routing (DORMIN) and route plans.
//!
//! Dimensions are resolved X, Y, Z in order. Each dimension takes the
//! shorter way around its ring; on a tie the route origin's coordinate in
//! that dimension decides (even goes positive, odd goes negative).

use crate::fault::FailedLink;
use crate::error::TopologyError;
use crate::topo::{NodeId, Sign, TorusShape};

/// One hop of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub dim: usize,
    pub sign: Sign,
}

/// A concrete node sequence from source to destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    nodes: Vec<NodeId>,
    moves: Vec<Move>,
}

impl RoutePlan {
    pub fn start(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            moves: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn hops(&self) -> usize {
        self.moves.len()
    }

    pub fn last(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    pub fn walk(
        &mut self,
        shape: &TorusShape,
        dim: usize,
        sign: Sign,
        hops: usize,
    ) -> Result<(), TopologyError> {
        for _ in 0..hops {
            let next = shape.neighbor(self.last(), dim, sign)?;
            self.nodes.push(next);
            self.moves.push(Move { dim, sign });
        }
        Ok(())
    }

    /// Append `tail`, which must start where this plan ends.
    pub fn extend(&mut self, tail: &RoutePlan) {
        debug_assert_eq!(tail.nodes[0], self.last());
        self.nodes.extend_from_slice(&tail.nodes[1..]);
        self.moves.extend_from_slice(&tail.moves);
    }

    /// Keep the first `hops` hops.
    pub fn truncate(&mut self, hops: usize) {
        self.moves.truncate(hops);
        self.nodes.truncate(hops + 1);
    }

    /// Index of the first hop crossing one of `links`.
    pub fn first_crossing(&self, links: &[FailedLink]) -> Option<(usize, FailedLink)> {
        self.nodes.windows(2).enumerate().find_map(|(i, w)| {
            links
                .iter()
                .find(|l| l.joins(w[0], w[1]))
                .map(|l| (i, *l))
        })
    }

    pub fn crosses(&self, link: &FailedLink) -> bool {
        self.nodes.windows(2).any(|w| link.joins(w[0], w[1]))
    }

    /// Does any node appear twice, or appear in `visited`.
    pub fn revisits(&self, visited: &[NodeId]) -> bool {
        self.nodes
            .iter()
            .enumerate()
            .any(|(i, n)| self.nodes[..i].contains(n) || visited.contains(n))
    }
}

/// Direction and hop count to resolve `dim` from `from` toward `to`.
pub fn leg_direction(
    shape: &TorusShape,
    origin: NodeId,
    from: NodeId,
    to: NodeId,
    dim: usize,
) -> Result<Option<(Sign, usize)>, TopologyError> {
    let (pos, neg) = shape.ring_distances(from, to, dim)?;
    if pos == 0 {
        return Ok(None);
    }
    Ok(Some(if pos < neg {
        (Sign::Positive, pos)
    } else if neg < pos {
        (Sign::Negative, neg)
    } else if shape.coordinate(origin, dim)? % 2 == 0 {
        (Sign::Positive, pos)
    } else {
        (Sign::Negative, neg)
    }))
}

/// Resolve each of `dims` in order from the plan's end toward `dst`.
pub fn resolve_dims(
    plan: &mut RoutePlan,
    shape: &TorusShape,
    origin: NodeId,
    dst: NodeId,
    dims: impl IntoIterator<Item = usize>,
) -> Result<(), TopologyError> {
    for dim in dims {
        if let Some((sign, hops)) = leg_direction(shape, origin, plan.last(), dst, dim)? {
            plan.walk(shape, dim, sign, hops)?;
        }
    }
    Ok(())
}

/// Fault-oblivious DORMIN path.
pub fn baseline_path(
    shape: &TorusShape,
    origin: NodeId,
    src: NodeId,
    dst: NodeId,
) -> Result<RoutePlan, TopologyError> {
    let mut plan = RoutePlan::start(src);
    resolve_dims(&mut plan, shape, origin, dst, 0..shape.dims())?;
    Ok(plan)
}

/// Node with `dst`'s coordinates in `resolved_dims` and `src`'s elsewhere.
pub fn intermediate_node(
    shape: &TorusShape,
    src: NodeId,
    dst: NodeId,
    resolved_dims: &[usize],
) -> Result<NodeId, TopologyError> {
    let mut coords = shape.to_coordinates(src)?;
    let target = shape.to_coordinates(dst)?;
    for &dim in resolved_dims {
        shape.check_dim(dim)?;
        coords[dim] = target[dim];
    }
    shape.to_id(&coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_way_round_and_parity_tie_break() {
        let shape = TorusShape::new(vec![4, 4]).unwrap();
        // 0 -> 3 along X: one hop negative.
        assert_eq!(
            leg_direction(&shape, NodeId(0), NodeId(0), NodeId(3), 0).unwrap(),
            Some((Sign::Negative, 1))
        );
        // tie: x=0 even goes positive, x=1 odd goes negative.
        assert_eq!(
            leg_direction(&shape, NodeId(0), NodeId(0), NodeId(2), 0).unwrap(),
            Some((Sign::Positive, 2))
        );
        assert_eq!(
            leg_direction(&shape, NodeId(1), NodeId(1), NodeId(3), 0).unwrap(),
            Some((Sign::Negative, 2))
        );
    }

    #[test]
    fn baseline_resolves_x_before_y() {
        let shape = TorusShape::new(vec![4, 4]).unwrap();
        let plan = baseline_path(&shape, NodeId(0), NodeId(0), NodeId(5)).unwrap();
        assert_eq!(plan.nodes(), &[NodeId(0), NodeId(1), NodeId(5)]);
        assert_eq!(
            intermediate_node(&shape, NodeId(0), NodeId(5), &[0]).unwrap(),
            NodeId(1)
        );
    }
}
