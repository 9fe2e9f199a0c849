//! Per-node collective streams and their phase queues.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::trace;

use super::arena::AlgorithmHandle;
use crate::fault::FailureType;
use crate::topo::NodeId;

/// Collective stream number, shared by every node taking part in the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StreamId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Created,
    Ready,
    Executing,
    Zombie,
    Dead,
}

/// One dimension pass of a stream's schedule.
///
/// `queue_id` is the phase's position in the schedule and doubles as the
/// transfer tag, so two passes over the same dimension never share messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub dimension: usize,
    pub queue_id: usize,
}

#[derive(Debug, Clone)]
pub struct Stream {
    pub id: StreamId,
    pub node: NodeId,
    pub state: StreamState,
    pub data_size: u64,
    pub original_data_size: u64,
    pub current: Option<Phase>,
    pub phases_to_go: VecDeque<Phase>,
    pub dims: usize,
    pub failure_type: FailureType,
    pub algorithm: Option<AlgorithmHandle>,
}

impl Stream {
    pub fn new(
        id: StreamId,
        node: NodeId,
        data_size: u64,
        schedule: &[usize],
        dims: usize,
        failure_type: FailureType,
    ) -> Self {
        let phases_to_go = schedule
            .iter()
            .enumerate()
            .map(|(queue_id, &dimension)| Phase {
                dimension,
                queue_id,
            })
            .collect();
        Self {
            id,
            node,
            state: StreamState::Created,
            data_size,
            original_data_size: data_size,
            current: None,
            phases_to_go,
            dims,
            failure_type,
            algorithm: None,
        }
    }

    pub fn change_state(&mut self, next: StreamState) {
        if self.state != next {
            trace!(stream = self.id.0, node = self.node.0, from = ?self.state, to = ?next, "stream state");
            self.state = next;
        }
    }

    /// Move the next scheduled phase into `current`.
    pub fn next_phase(&mut self) -> Option<Phase> {
        self.current = self.phases_to_go.pop_front();
        self.current
    }

    /// Position of the current phase within the failure-type stage cycle.
    pub fn chunk_stage(&self) -> usize {
        (self.failure_type.stage_cycle() * self.dims)
            .saturating_sub(self.phases_to_go.len() + 1)
    }

    pub fn is_dead(&self) -> bool {
        self.state == StreamState::Dead
    }
}
