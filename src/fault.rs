//! Failed-link registry and failure-scheduling policies.
//!
//! The registry is built once from configuration and is read-only while a
//! run is in progress. The collective engine reads it for failure-aware
//! sizing and the adaptive router reads it for detours, so both always see
//! the same set of failures.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TopologyError};
use crate::topo::{NodeId, TorusShape};

/// An undirected failed link. `(a, b)` and `(b, a)` are the same link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(NodeId, NodeId)", into = "(NodeId, NodeId)")]
pub struct FailedLink {
    lo: NodeId,
    hi: NodeId,
}

impl FailedLink {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.lo, self.hi)
    }

    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        *self == Self::new(a, b)
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.lo == node || self.hi == node
    }
}

impl From<(NodeId, NodeId)> for FailedLink {
    fn from((a, b): (NodeId, NodeId)) -> Self {
        Self::new(a, b)
    }
}

impl From<FailedLink> for (NodeId, NodeId) {
    fn from(link: FailedLink) -> Self {
        (link.lo, link.hi)
    }
}

/// Parses `a-b` (or `a,b`) node id pairs.
impl std::str::FromStr for FailedLink {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            key: "failed_link".into(),
            value: raw.to_string(),
        };
        let (a, b) = raw.split_once(['-', ',']).ok_or_else(invalid)?;
        let a = a.trim().parse().map_err(|_| invalid())?;
        let b = b.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(NodeId(a), NodeId(b)))
    }
}

/// How chunk scheduling reacts to link failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkFailureScheduling {
    #[default]
    Baseline,
    Mate,
    MateEnhanced,
}

impl LinkFailureScheduling {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let compact: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .collect();
        match compact.as_str() {
            "" | "baseline" | "none" => Ok(Self::Baseline),
            "mate" => Ok(Self::Mate),
            "mateenhanced" => Ok(Self::MateEnhanced),
            _ => Err(ConfigError::InvalidValue {
                key: "link_failure_scheduling".into(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn is_mate(self) -> bool {
        matches!(self, Self::Mate | Self::MateEnhanced)
    }
}

/// Failure-type classifier.
///
/// Types 1 and 4 are "severe" and run the three-stage chunk cycle, every
/// other value runs the two-stage cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureType(pub u32);

impl FailureType {
    pub fn is_severe(self) -> bool {
        matches!(self.0, 1 | 4)
    }

    pub fn stage_cycle(self) -> usize {
        if self.is_severe() { 3 } else { 2 }
    }

    /// Whether a chunk at `stage` belongs to the accelerated period.
    pub fn is_accelerated(self, stage: usize) -> bool {
        if self.is_severe() {
            stage % 3 != 0
        } else {
            stage % 2 == 1
        }
    }
}

/// Repetition pattern of the per-chunk dimension schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicy {
    Baseline,
    Paired,
    Tripled,
}

impl SchedulePolicy {
    pub fn derive(scheduling: LinkFailureScheduling, failure_type: FailureType) -> Self {
        match scheduling {
            LinkFailureScheduling::Baseline => Self::Baseline,
            _ if failure_type.is_severe() => Self::Tripled,
            _ => Self::Paired,
        }
    }

    /// How many consecutive times each dimension appears.
    pub fn repeat(self) -> usize {
        match self {
            Self::Baseline => 1,
            Self::Paired => 2,
            Self::Tripled => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FaultRegistry {
    shape: TorusShape,
    links: Vec<FailedLink>,
    link_dims: Vec<usize>,
    per_dimension: Vec<usize>,
    failed_ring_nodes: usize,
}

impl FaultRegistry {
    /// Registry with no failed links.
    pub fn healthy(shape: &TorusShape) -> Self {
        Self {
            shape: shape.clone(),
            links: Vec::new(),
            link_dims: Vec::new(),
            per_dimension: vec![0; shape.dims()],
            failed_ring_nodes: 0,
        }
    }

    /// Validates every link is a single torus hop; duplicates collapse.
    pub fn new(shape: &TorusShape, links: Vec<FailedLink>) -> Result<Self, ConfigError> {
        let mut registry = Self::healthy(shape);
        for link in links {
            if registry.links.contains(&link) {
                continue;
            }
            let dim = single_hop_dimension(shape, link)?;
            registry.per_dimension[dim] += 1;
            registry.links.push(link);
            registry.link_dims.push(dim);
        }
        registry.failed_ring_nodes = registry
            .per_dimension
            .iter()
            .zip(shape.extents())
            .filter(|(count, _)| **count > 0)
            .map(|(_, extent)| *extent)
            .max()
            .unwrap_or(0);
        Ok(registry)
    }

    /// Overrides per-dimension failure counts (sizing studies without
    /// concrete links).
    pub fn with_dimension_counts(mut self, counts: Vec<usize>) -> Result<Self, ConfigError> {
        if counts.len() != self.shape.dims() {
            return Err(ConfigError::FailureCountArity {
                got: counts.len(),
                dims: self.shape.dims(),
            });
        }
        if self.links.is_empty() {
            self.failed_ring_nodes = counts
                .iter()
                .zip(self.shape.extents())
                .filter(|(count, _)| **count > 0)
                .map(|(_, extent)| *extent)
                .max()
                .unwrap_or(0);
        }
        self.per_dimension = counts;
        Ok(self)
    }

    pub fn with_failed_ring_nodes(mut self, nodes: usize) -> Self {
        self.failed_ring_nodes = nodes;
        self
    }

    pub fn shape(&self) -> &TorusShape {
        &self.shape
    }

    pub fn links(&self) -> &[FailedLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.links.iter().any(|l| l.joins(a, b))
    }

    /// Dimension a registered link runs along.
    pub fn link_dimension(&self, link: &FailedLink) -> Option<usize> {
        self.links
            .iter()
            .position(|l| l == link)
            .map(|i| self.link_dims[i])
    }

    pub fn failures_in_dimension(&self, dim: usize) -> usize {
        self.per_dimension.get(dim).copied().unwrap_or(0)
    }

    /// Node count of the ring hit by failures ("nodes affected").
    pub fn failed_ring_nodes(&self) -> usize {
        self.failed_ring_nodes
    }

    /// Does the ring through `node` along `dim` contain a failed link.
    pub fn ring_through_has_fault(&self, node: NodeId, dim: usize) -> Result<bool, TopologyError> {
        let members = self.shape.members(node, dim)?;
        Ok(self
            .links
            .iter()
            .zip(&self.link_dims)
            .any(|(link, &d)| {
                let (a, b) = link.endpoints();
                d == dim && members.contains(&a) && members.contains(&b)
            }))
    }

    /// Does the ring containing hop `a -> b` contain a failed link.
    pub fn ring_has_fault(&self, a: NodeId, b: NodeId) -> Result<bool, ConfigError> {
        let dim = single_hop_dimension(&self.shape, FailedLink::new(a, b))?;
        Ok(self.ring_through_has_fault(a, dim)?)
    }
}

fn single_hop_dimension(shape: &TorusShape, link: FailedLink) -> Result<usize, ConfigError> {
    let (a, b) = link.endpoints();
    let dims = shape.differing_dims(a, b)?;
    let not_a_link = || ConfigError::NotALink { a, b };
    let [dim] = dims.as_slice() else {
        return Err(not_a_link());
    };
    let (pos, neg) = shape.ring_distances(a, b, *dim)?;
    if pos != 1 && neg != 1 {
        return Err(not_a_link());
    }
    Ok(*dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_link_is_undirected() {
        assert_eq!(
            FailedLink::new(NodeId(5), NodeId(1)),
            FailedLink::new(NodeId(1), NodeId(5))
        );
        assert!(FailedLink::new(NodeId(5), NodeId(1)).joins(NodeId(1), NodeId(5)));
        assert_eq!("5-1".parse::<FailedLink>().unwrap(), FailedLink::new(NodeId(1), NodeId(5)));
        assert_eq!("1, 5".parse::<FailedLink>().unwrap(), FailedLink::new(NodeId(1), NodeId(5)));
        assert!("1-x".parse::<FailedLink>().is_err());
    }

    #[test]
    fn severe_types_use_three_stage_cycle() {
        for t in [1, 4] {
            assert!(FailureType(t).is_severe());
            assert_eq!(FailureType(t).stage_cycle(), 3);
        }
        for t in [0, 2, 3, 5] {
            assert!(!FailureType(t).is_severe());
        }
        assert_eq!(
            SchedulePolicy::derive(LinkFailureScheduling::Mate, FailureType(4)),
            SchedulePolicy::Tripled
        );
        assert_eq!(
            SchedulePolicy::derive(LinkFailureScheduling::MateEnhanced, FailureType(2)),
            SchedulePolicy::Paired
        );
        assert_eq!(
            SchedulePolicy::derive(LinkFailureScheduling::Baseline, FailureType(1)),
            SchedulePolicy::Baseline
        );
    }

    #[test]
    fn parse_scheduling_names() {
        assert_eq!(
            LinkFailureScheduling::parse("mate_enhanced").unwrap(),
            LinkFailureScheduling::MateEnhanced
        );
        assert_eq!(
            LinkFailureScheduling::parse("MATE").unwrap(),
            LinkFailureScheduling::Mate
        );
        assert!(LinkFailureScheduling::parse("mystery").is_err());
    }
}
