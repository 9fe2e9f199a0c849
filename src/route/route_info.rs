use serde::Serialize;

use super::dormin::RoutePlan;
use crate::topo::NodeId;

/// Per-packet routing state carried hop to hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub src: NodeId,
    pub dst: NodeId,
    pub vnet: usize,
    pub last_routing_dim: Option<usize>,
    pub crossed_dateline: bool,
    /// Replacement path after the router turned away from a failed link.
    #[serde(skip)]
    pub detour: Option<RoutePlan>,
}

impl RouteInfo {
    pub fn new(src: NodeId, dst: NodeId, vnet: usize) -> Self {
        Self {
            src,
            dst,
            vnet,
            last_routing_dim: None,
            crossed_dateline: false,
            detour: None,
        }
    }

    /// Dateline bookkeeping for a hop along `dim`; `wraps` is true when the
    /// hop goes from extent-1 to 0 or back.
    pub fn record_hop(&mut self, dim: usize, wraps: bool) {
        if self.last_routing_dim != Some(dim) {
            self.crossed_dateline = false;
        }
        if wraps {
            self.crossed_dateline = true;
        }
        self.last_routing_dim = Some(dim);
    }
}
