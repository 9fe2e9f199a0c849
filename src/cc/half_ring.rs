//! HalfRing variant: All-to-All over one ring with failure-aware sizing.

use super::algorithm::{AlgorithmSpec, InjectionPolicy, Plan};
use super::sizing::{self, SizingInputs};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct HalfRingState {
    sizing: SizingInputs,
}

impl HalfRingState {
    pub fn new(sizing: SizingInputs) -> Self {
        Self { sizing }
    }

    pub fn sizing(&self) -> &SizingInputs {
        &self.sizing
    }

    pub fn plan(&self, spec: &AlgorithmSpec, data: u64) -> Result<Plan, ConfigError> {
        let n = spec.ring.nodes_in_ring();
        let parallel_reduce = match spec.injection {
            InjectionPolicy::Aggressive => n.saturating_sub(1).max(1),
            InjectionPolicy::Normal => 1,
        };
        Ok(Plan {
            stream_count: sizing::half_ring_stream_count(&self.sizing)?,
            msg_size: sizing::half_ring_msg_size(&self.sizing, data),
            parallel_reduce,
        })
    }

    pub fn recv_size(&self, src_data: u64) -> u64 {
        sizing::half_ring_msg_size(&self.sizing, src_data)
    }
}
