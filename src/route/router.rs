//! Hop-by-hop adaptive router with a per-(source, destination) plan cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::direction::{Direction, Port};
use super::dormin::{RoutePlan, baseline_path, resolve_dims};
use super::route_info::RouteInfo;
use super::sandwich::Sandwich;
use crate::error::{ConfigError, RoutingError};
use crate::fault::FaultRegistry;
use crate::topo::{NodeId, Sign, TorusShape};

/// Routing algorithm, chosen by how many links are down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAlgorithm {
    Dormin,
    Sandwich,
    Sandwiches,
}

impl RoutingAlgorithm {
    pub fn for_failures(failures: usize) -> Result<Self, ConfigError> {
        match failures {
            0 => Ok(Self::Dormin),
            1 => Ok(Self::Sandwich),
            2 => Ok(Self::Sandwiches),
            n => Err(ConfigError::TooManyFailures(n)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dormin => "dormin",
            Self::Sandwich => "sandwich",
            Self::Sandwiches => "sandwiches",
        }
    }

    fn expected_failures(self) -> Option<usize> {
        match self {
            Self::Dormin => None,
            Self::Sandwich => Some(1),
            Self::Sandwiches => Some(2),
        }
    }
}

/// One routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteStep {
    pub next: NodeId,
    pub port: Port,
}

#[derive(Debug)]
pub struct AdaptiveRouter {
    faults: Arc<FaultRegistry>,
    algorithm: RoutingAlgorithm,
    plans: HashMap<(NodeId, NodeId), RoutePlan>,
}

impl AdaptiveRouter {
    pub fn new(
        faults: Arc<FaultRegistry>,
        algorithm: RoutingAlgorithm,
    ) -> Result<Self, ConfigError> {
        let dims = faults.shape().dims();
        if dims > 3 {
            return Err(ConfigError::TooManyDimensions(dims));
        }
        if faults.len() > 2 {
            return Err(ConfigError::TooManyFailures(faults.len()));
        }
        if let Some(expected) = algorithm.expected_failures() {
            if faults.len() != expected {
                return Err(ConfigError::FailureCountMismatch {
                    algo: algorithm.name(),
                    expected,
                    got: faults.len(),
                });
            }
        }
        debug!(algorithm = algorithm.name(), failures = faults.len(), "adaptive router");
        Ok(Self {
            faults,
            algorithm,
            plans: HashMap::new(),
        })
    }

    pub fn algorithm(&self) -> RoutingAlgorithm {
        self.algorithm
    }

    pub fn shape(&self) -> &TorusShape {
        self.faults.shape()
    }

    pub fn faults(&self) -> &FaultRegistry {
        &self.faults
    }

    /// Full planned path, computed once per (source, destination).
    pub fn path(&mut self, src: NodeId, dst: NodeId) -> Result<&RoutePlan, RoutingError> {
        if !self.plans.contains_key(&(src, dst)) {
            let shape = self.faults.shape();
            shape.check_node(src)?;
            shape.check_node(dst)?;
            let plan = match self.algorithm {
                // DORMIN is fault-oblivious; the next-hop guard still applies.
                RoutingAlgorithm::Dormin => baseline_path(shape, src, src, dst)?,
                RoutingAlgorithm::Sandwich | RoutingAlgorithm::Sandwiches => Sandwich {
                    faults: &self.faults,
                    origin: src,
                }
                .plan(src, dst)?,
            };
            trace!(?src, ?dst, hops = plan.hops(), "route planned");
            self.plans.insert((src, dst), plan);
        }
        self.plans
            .get(&(src, dst))
            .ok_or(RoutingError::NoDetour { src, dst })
    }

    pub fn hops(&mut self, src: NodeId, dst: NodeId) -> Result<usize, RoutingError> {
        Ok(self.path(src, dst)?.hops())
    }

    /// Output port for a packet currently at `current`; updates dateline state.
    pub fn next_hop(
        &mut self,
        info: &mut RouteInfo,
        current: NodeId,
    ) -> Result<RouteStep, RoutingError> {
        if current == info.dst {
            return Ok(RouteStep {
                next: current,
                port: Port {
                    direction: Direction::Local,
                    channel: usize::from(info.crossed_dateline),
                },
            });
        }
        let detour_hop = info.detour.as_ref().and_then(|d| {
            d.position(current)
                .map(|pos| (d.nodes()[pos + 1], d.moves()[pos]))
        });
        let (mut next, mv) = match detour_hop {
            Some(hop) => hop,
            None => {
                let plan = self.path(info.src, info.dst)?;
                let pos = plan.position(current).ok_or(RoutingError::OffPath {
                    current,
                    src: info.src,
                    dst: info.dst,
                })?;
                (plan.nodes()[pos + 1], plan.moves()[pos])
            }
        };
        let mut sign = mv.sign;

        let shape = self.faults.shape();
        if self.faults.contains(current, next) {
            warn!(?current, ?next, dim = mv.dim, "next hop is a failed link, reversing");
            sign = sign.flip();
            next = shape.neighbor(current, mv.dim, sign)?;
            // finish this dimension the other way round, then the later ones
            let (pos, neg) = shape.ring_distances(current, info.dst, mv.dim)?;
            let hops = match sign {
                Sign::Positive => pos,
                Sign::Negative => neg,
            };
            let mut detour = RoutePlan::start(current);
            detour.walk(shape, mv.dim, sign, hops)?;
            resolve_dims(&mut detour, shape, info.src, info.dst, mv.dim + 1..shape.dims())?;
            info.detour = Some(detour);
        }

        let coord = shape.coordinate(current, mv.dim)?;
        let extent = shape.extent(mv.dim)?;
        let wraps = match sign {
            Sign::Positive => coord == extent - 1,
            Sign::Negative => coord == 0,
        };
        info.record_hop(mv.dim, wraps);

        let step = RouteStep {
            next,
            port: Port {
                direction: Direction::of(mv.dim, sign)?,
                channel: usize::from(info.crossed_dateline),
            },
        };
        trace!(?current, next = ?step.next, direction = %step.port.direction, dateline = info.crossed_dateline, "route hop");
        Ok(step)
    }

    /// Walks [`Self::next_hop`] from `src` until `dst`, returning the node
    /// each decision was taken at.
    pub fn trace(
        &mut self,
        src: NodeId,
        dst: NodeId,
        vnet: usize,
    ) -> Result<Vec<(NodeId, RouteStep)>, RoutingError> {
        let mut info = RouteInfo::new(src, dst, vnet);
        let limit = self.shape().len() * self.shape().dims() + 1;
        let mut hops = Vec::new();
        let mut current = src;
        while current != dst {
            if hops.len() >= limit {
                return Err(RoutingError::NoDetour { src, dst });
            }
            let step = self.next_hop(&mut info, current)?;
            hops.push((current, step));
            current = step.next;
        }
        Ok(hops)
    }

    /// Hop count between two nodes on a common ring.
    pub fn hops_between(&self, a: NodeId, b: NodeId) -> Result<usize, RoutingError> {
        let shape = self.faults.shape();
        match shape.differing_dims(a, b)?.as_slice() {
            [] => Ok(0),
            [dim] => {
                let (pos, neg) = shape.ring_distances(a, b, *dim)?;
                Ok(pos.min(neg))
            }
            _ => Err(RoutingError::NotAligned { a, b }),
        }
    }
}
