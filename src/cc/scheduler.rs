//! Dimension scheduling: which dimensions a chunk visits, in which order.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fault::{FailureType, LinkFailureScheduling, SchedulePolicy};

/// Inter-dimension scheduler variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterDimensionScheduling {
    /// Rotating start dimension, repeated per failure policy.
    #[default]
    NdTorusRing,
    /// Paired whenever a MATE scheduling is active, whatever the failure type.
    NdTorusRingAllToAllAllReduce,
    /// Single phase over dimension 0 (global pairwise exchange).
    OneStage,
}

impl InterDimensionScheduling {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let compact: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .collect();
        match compact.as_str() {
            "" | "ndtorusring" | "baseline" => Ok(Self::NdTorusRing),
            "ndtorusringalltoallallreduce" => Ok(Self::NdTorusRingAllToAllAllReduce),
            "onestage" => Ok(Self::OneStage),
            _ => Err(ConfigError::InvalidValue {
                key: "inter_dimension_scheduling".into(),
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DimensionScheduler {
    dims: usize,
    variant: InterDimensionScheduling,
    policy: SchedulePolicy,
}

impl DimensionScheduler {
    pub fn new(
        dims: usize,
        variant: InterDimensionScheduling,
        scheduling: LinkFailureScheduling,
        failure_type: FailureType,
    ) -> Self {
        let policy = match variant {
            InterDimensionScheduling::NdTorusRing => {
                SchedulePolicy::derive(scheduling, failure_type)
            }
            InterDimensionScheduling::NdTorusRingAllToAllAllReduce if scheduling.is_mate() => {
                SchedulePolicy::Paired
            }
            _ => SchedulePolicy::Baseline,
        };
        Self {
            dims,
            variant,
            policy,
        }
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// Ordered dimension list for `chunk_id`. Never empty for `dims >= 1`.
    pub fn get_chunk_scheduling(&self, chunk_id: u64) -> Vec<usize> {
        if self.variant == InterDimensionScheduling::OneStage || self.dims == 0 {
            return vec![0];
        }
        let start = (chunk_id % self.dims as u64) as usize;
        let repeat = self.policy.repeat();
        (0..self.dims)
            .flat_map(|i| std::iter::repeat_n((start + i) % self.dims, repeat))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_starts_at_chunk_modulo_dims() {
        let s = DimensionScheduler::new(
            4,
            InterDimensionScheduling::NdTorusRing,
            LinkFailureScheduling::Baseline,
            FailureType(0),
        );
        assert_eq!(s.get_chunk_scheduling(6), vec![2, 3, 0, 1]);
        assert_eq!(s.get_chunk_scheduling(0), vec![0, 1, 2, 3]);
    }

    #[test]
    fn paired_repeats_each_dimension() {
        let s = DimensionScheduler::new(
            4,
            InterDimensionScheduling::NdTorusRing,
            LinkFailureScheduling::Mate,
            FailureType(2),
        );
        assert_eq!(s.get_chunk_scheduling(6), vec![2, 2, 3, 3, 0, 0, 1, 1]);
    }
}
