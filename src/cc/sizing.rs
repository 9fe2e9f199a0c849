//! Stream-count and message-size strategies for the two ring variants.
//!
//! The failure-aware formulas are evaluated in `f64` and truncated to an
//! integer byte count only at the end.

use super::collective::CollectiveOp;
use crate::error::ConfigError;
use crate::fault::{FailureType, LinkFailureScheduling};

/// Everything the sizing formulas depend on for one algorithm instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInputs {
    pub op: CollectiveOp,
    /// Dimension this ring runs along.
    pub dim: usize,
    /// Nodes in this dimension's ring (`n`).
    pub nodes_in_ring: usize,
    pub total_nodes: usize,
    /// Torus dimensionality (`D`).
    pub dims: usize,
    /// Largest per-dimension extent (`M`).
    pub max_extent: usize,
    /// Failures in this dimension (`f`).
    pub failures_in_dim: usize,
    /// Node count of the failed ring (`m`).
    pub failed_ring_nodes: usize,
    pub scheduling: LinkFailureScheduling,
    pub failure_type: FailureType,
    pub chunk_stage: usize,
}

impl SizingInputs {
    /// Accelerated period of a MATE schedule.
    pub fn accelerated(&self) -> bool {
        self.scheduling.is_mate() && self.failure_type.is_accelerated(self.chunk_stage)
    }

    /// Base period of a MATE schedule.
    pub fn base(&self) -> bool {
        self.scheduling.is_mate() && !self.failure_type.is_accelerated(self.chunk_stage)
    }
}

/// Data size after the collective completes on this ring.
pub fn final_data_size(op: CollectiveOp, nodes_in_ring: usize, data: u64) -> u64 {
    let n = nodes_in_ring.max(1) as u64;
    match op {
        CollectiveOp::Allreduce | CollectiveOp::Alltoall => data,
        CollectiveOp::Allgather => data.saturating_mul(n),
        CollectiveOp::Reducescatter => data / n,
    }
}

pub fn ring_stream_count(op: CollectiveOp, nodes_in_ring: usize, total_nodes: usize) -> u64 {
    let steps = nodes_in_ring.saturating_sub(1) as u64;
    match op {
        CollectiveOp::Allreduce => 2 * steps,
        CollectiveOp::Alltoall => total_nodes.saturating_sub(1) as u64,
        CollectiveOp::Allgather | CollectiveOp::Reducescatter => steps,
    }
}

pub fn ring_msg_size(op: CollectiveOp, nodes_in_ring: usize, total_nodes: usize, data: u64) -> u64 {
    let n = nodes_in_ring.max(1) as u64;
    match op {
        CollectiveOp::Allreduce | CollectiveOp::Reducescatter => data / n,
        CollectiveOp::Allgather => data,
        CollectiveOp::Alltoall => data / total_nodes.max(1) as u64,
    }
}

/// Receive size for a packet whose source holds `src_data` (non-uniform traffic).
pub fn ring_recv_size(total_nodes: usize, src_data: u64) -> u64 {
    src_data / total_nodes.max(1) as u64
}

pub fn half_ring_stream_count(p: &SizingInputs) -> Result<u64, ConfigError> {
    if p.op != CollectiveOp::Alltoall {
        return Err(ConfigError::UnsupportedCollective {
            algo: "half_ring",
            op: p.op.name(),
        });
    }
    let n = p.nodes_in_ring as u64;
    let mut count = match p.failures_in_dim {
        0 if n == 2 => 2,
        0 if n % 2 == 0 => 2 * n * n / 8,
        0 => 2 * (n * n).saturating_sub(1) / 8,
        1 if n == 2 => return Err(ConfigError::TwoNodeRingFailure { dim: p.dim }),
        1 => n * n.saturating_sub(1) / 2,
        count => return Err(ConfigError::TooManyRingFailures { dim: p.dim, count }),
    };

    let m = p.failed_ring_nodes as u64;
    let big_m = p.max_extent as u64;
    if p.accelerated() {
        count = if m % 2 == 0 {
            ((m * m) as f64 / 8.0 * 2.0).ceil() as u64
        } else {
            (m * m).saturating_sub(1) / 8 * 2
        };
    }
    let base_override = match p.scheduling {
        LinkFailureScheduling::Mate => p.base(),
        LinkFailureScheduling::MateEnhanced => p.base() && p.failures_in_dim == 0,
        LinkFailureScheduling::Baseline => false,
    };
    if base_override {
        count = if m == 2 {
            2
        } else if m % 2 == 0 {
            ((big_m * big_m) as f64 / 8.0 * 2.0).ceil() as u64
        } else {
            (big_m * big_m).saturating_sub(1) / 8 * 2
        };
    }
    Ok(count)
}

/// HalfRing All-to-All message size for a node holding `data` bytes.
pub fn half_ring_msg_size(p: &SizingInputs, data: u64) -> u64 {
    // half_ring_stream_count rejects a ring with more failures first
    debug_assert!(p.failures_in_dim <= 1, "ring with {} failures", p.failures_in_dim);
    let n = p.nodes_in_ring.max(1);
    let even = n % 2 == 0;
    let s = data as f64;
    let m = p.failed_ring_nodes as f64;
    let big_m = p.max_extent as f64;
    let d = p.dims as f64;
    let share_even = 1.0 / ((d - 1.0) + (m + 1.0) / (4.0 * m));
    let share_odd = 1.0 / ((d - 1.0) + m / (4.0 * (m - 1.0)));

    let size = match p.scheduling {
        LinkFailureScheduling::Baseline => return data / n as u64,
        LinkFailureScheduling::MateEnhanced if p.accelerated() => {
            if even {
                ((s / m) * (1.0 - big_m / (4.0 * (m - 1.0)))).ceil() * share_even
            } else {
                ((s / m) * (1.0 - (big_m + 1.0) / (4.0 * m))).ceil() * share_odd
            }
        }
        LinkFailureScheduling::Mate if p.accelerated() => {
            if even {
                (s / m).ceil() * share_even
            } else {
                (s / m).ceil() * share_odd
            }
        }
        LinkFailureScheduling::MateEnhanced if p.failures_in_dim == 1 => {
            if even {
                ((s / m) * (big_m / (4.0 * (m - 1.0)))).ceil()
            } else {
                ((s / m) * ((big_m + 1.0) / (4.0 * m))).ceil()
            }
        }
        LinkFailureScheduling::Mate | LinkFailureScheduling::MateEnhanced => {
            return data / p.max_extent.max(1) as u64;
        }
    };
    size as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(n: usize, scheduling: LinkFailureScheduling, stage: usize) -> SizingInputs {
        SizingInputs {
            op: CollectiveOp::Alltoall,
            dim: 0,
            nodes_in_ring: n,
            total_nodes: n * n,
            dims: 2,
            max_extent: n,
            failures_in_dim: 1,
            failed_ring_nodes: n,
            scheduling,
            failure_type: FailureType(0),
            chunk_stage: stage,
        }
    }

    #[test]
    fn baseline_sizes() {
        assert_eq!(final_data_size(CollectiveOp::Allgather, 4, 100), 400);
        assert_eq!(final_data_size(CollectiveOp::Reducescatter, 4, 100), 25);
        assert_eq!(ring_msg_size(CollectiveOp::Alltoall, 4, 16, 1600), 100);
        assert_eq!(ring_stream_count(CollectiveOp::Allreduce, 4, 16), 6);
        assert_eq!(ring_stream_count(CollectiveOp::Alltoall, 4, 16), 15);
    }

    #[test]
    fn mate_enhanced_base_period_uses_quarter_share() {
        let p = inputs(8, LinkFailureScheduling::MateEnhanced, 0);
        assert_eq!(half_ring_msg_size(&p, 1_048_576), 37_450);
        let p = inputs(5, LinkFailureScheduling::MateEnhanced, 0);
        assert_eq!(half_ring_msg_size(&p, 1_048_576), 62_915);
    }
}
