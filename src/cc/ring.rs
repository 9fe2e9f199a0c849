//! Ring variant: classic ring collectives plus the global pairwise All-to-All.

use super::algorithm::{AlgorithmSpec, InjectionPolicy, Plan};
use super::collective::CollectiveOp;
use super::sizing;
use crate::topo::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingState {
    total_nodes: usize,
    /// Packets addressed so far (pairwise exchange step counter).
    peers_addressed: usize,
}

impl RingState {
    pub fn new(total_nodes: usize) -> Self {
        Self {
            total_nodes,
            peers_addressed: 0,
        }
    }

    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn plan(&self, spec: &AlgorithmSpec, data: u64) -> Plan {
        let n = spec.ring.nodes_in_ring();
        let parallel_reduce = match (spec.op, spec.injection) {
            (CollectiveOp::Alltoall, InjectionPolicy::Aggressive) => n.saturating_sub(1).max(1),
            _ => 1,
        };
        Plan {
            stream_count: sizing::ring_stream_count(spec.op, n, self.total_nodes),
            msg_size: sizing::ring_msg_size(spec.op, n, self.total_nodes, data),
            parallel_reduce,
        }
    }

    /// `(receive from, send to)` for the next All-to-All packet.
    ///
    /// The k-th packet exchanges with `id ^ k` on power-of-two node counts,
    /// otherwise sends to `id + k` and receives from `id - k`.
    pub fn next_pairwise_peers(&mut self, id: NodeId) -> (NodeId, NodeId) {
        let total = self.total_nodes;
        if total <= 1 {
            return (id, id);
        }
        let k = self.peers_addressed % (total - 1) + 1;
        self.peers_addressed += 1;
        if total.is_power_of_two() {
            let peer = NodeId(id.0 ^ k);
            (peer, peer)
        } else {
            (NodeId((id.0 + total - k) % total), NodeId((id.0 + k) % total))
        }
    }

    pub fn recv_size(&self, src_data: u64) -> u64 {
        sizing::ring_recv_size(self.total_nodes, src_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairwise_peers_use_xor_on_power_of_two() {
        let mut st = RingState::new(8);
        let peers: Vec<_> = (0..7).map(|_| st.next_pairwise_peers(NodeId(5)).1.0).collect();
        assert_eq!(peers, vec![4, 7, 6, 1, 0, 3, 2]);
    }

    #[test]
    fn pairwise_peers_shift_otherwise() {
        let mut st = RingState::new(6);
        assert_eq!(st.next_pairwise_peers(NodeId(1)), (NodeId(0), NodeId(2)));
        assert_eq!(st.next_pairwise_peers(NodeId(1)), (NodeId(5), NodeId(3)));
    }
}
