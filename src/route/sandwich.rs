//! Sandwich detours around failed links.
//!
//! When the minimal path would cross a failed link in dimension `fd`, the
//! packet first takes one sidestep hop in a "bread" dimension `e`, then
//! resolves `fd` on the neighbouring (healthy) ring, then finishes `e` and
//! the remaining dimensions. If no other dimension is usable, `fd` is
//! traversed the other way round its ring instead.
//!
//! With two failures the first one met is bypassed this way; if the chosen
//! detour then meets the second failure, the same procedure runs again from
//! the last node before it.

use tracing::trace;

use super::dormin::{RoutePlan, baseline_path, leg_direction, resolve_dims};
use crate::error::RoutingError;
use crate::fault::{FailedLink, FaultRegistry};
use crate::topo::{NodeId, Sign};

/// Detour search over a fault registry.
pub struct Sandwich<'a> {
    pub faults: &'a FaultRegistry,
    pub origin: NodeId,
}

impl Sandwich<'_> {
    /// Fault-free plan `src -> dst` bypassing up to `faults.len()` failures.
    pub fn plan(&self, src: NodeId, dst: NodeId) -> Result<RoutePlan, RoutingError> {
        let links = self.faults.links();
        self.detour(src, dst, links, &[], links.len())?
            .ok_or(RoutingError::NoDetour { src, dst })
    }

    fn detour(
        &self,
        current: NodeId,
        dst: NodeId,
        links: &[FailedLink],
        visited: &[NodeId],
        depth: usize,
    ) -> Result<Option<RoutePlan>, RoutingError> {
        let shape = self.faults.shape();
        let base = baseline_path(shape, self.origin, current, dst)?;
        let Some((_, failed)) = base.first_crossing(links) else {
            return Ok((!base.revisits(visited)).then_some(base));
        };
        if depth == 0 {
            return Ok(None);
        }

        for cand in self.candidates(current, dst, &failed)? {
            if cand.crosses(&failed) {
                continue;
            }
            match cand.first_crossing(links) {
                None if !cand.revisits(visited) => return Ok(Some(cand)),
                None => continue,
                Some((hop, other)) => {
                    trace!(?current, ?dst, ?other, hop, "detour meets another failure");
                    let mut prefix = cand.clone();
                    prefix.truncate(hop);
                    if prefix.revisits(visited) {
                        continue;
                    }
                    let mut seen = visited.to_vec();
                    seen.extend_from_slice(&prefix.nodes()[..prefix.nodes().len() - 1]);
                    if let Some(rest) =
                        self.detour(prefix.last(), dst, links, &seen, depth - 1)?
                    {
                        prefix.extend(&rest);
                        return Ok(Some(prefix));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Candidate detours around `failed`, most preferred first.
    fn candidates(
        &self,
        current: NodeId,
        dst: NodeId,
        failed: &FailedLink,
    ) -> Result<Vec<RoutePlan>, RoutingError> {
        let shape = self.faults.shape();
        let fd = self
            .faults
            .link_dimension(failed)
            .ok_or(RoutingError::NoDetour { src: current, dst })?;
        let dims = shape.dims();

        let mut needed = Vec::with_capacity(dims);
        for dim in 0..dims {
            needed.push(leg_direction(shape, self.origin, current, dst, dim)?);
        }

        // Bread order: later dims the path needs, later idle dims, then earlier ones.
        let usable = |d: usize| d != fd && shape.extents()[d] > 1;
        let mut bread: Vec<usize> = Vec::new();
        for later in [true, false] {
            for want in [true, false] {
                bread.extend((0..dims).filter(|&d| {
                    usable(d) && (d > fd) == later && needed[d].is_some() == want
                }));
            }
        }

        let mut out = Vec::new();
        for e in bread {
            let preferred = match needed[e] {
                Some((sign, _)) => sign,
                None if shape.coordinate(self.origin, e)? % 2 == 0 => Sign::Positive,
                None => Sign::Negative,
            };
            let mut signs = vec![preferred];
            if shape.extents()[e] > 2 {
                signs.push(preferred.flip());
            }

            let mut plans = Vec::with_capacity(signs.len());
            for sign in signs {
                let mut plan = RoutePlan::start(current);
                resolve_dims(
                    &mut plan,
                    shape,
                    self.origin,
                    dst,
                    (0..fd).filter(|&d| d != e),
                )?;
                plan.walk(shape, e, sign, 1)?;
                let lands_on_fault = self.faults.ring_through_has_fault(plan.last(), fd)?;
                resolve_dims(&mut plan, shape, self.origin, dst, [fd, e])?;
                resolve_dims(&mut plan, shape, self.origin, dst, 0..dims)?;
                plans.push((lands_on_fault, plan));
            }
            // Sidesteps onto a ring with another failure go last.
            plans.sort_by_key(|(faulty, _)| *faulty);
            out.extend(plans.into_iter().map(|(_, p)| p));
        }

        if let Some((sign, hops)) = needed[fd] {
            let mut plan = RoutePlan::start(current);
            resolve_dims(&mut plan, shape, self.origin, dst, 0..fd)?;
            plan.walk(shape, fd, sign.flip(), shape.extents()[fd] - hops)?;
            resolve_dims(&mut plan, shape, self.origin, dst, 0..dims)?;
            out.push(plan);
        }
        trace!(?current, ?dst, ?failed, fd, candidates = out.len(), "sandwich candidates");
        Ok(out)
    }
}
