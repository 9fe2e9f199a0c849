//! Per-dimension collective state machine shared by the ring variants.
//!
//! One [`Algorithm`] drives one stream over one dimension. It is fed three
//! events by its owner:
//!
//! - `StreamInit`: inject `parallel_reduce` packets;
//! - `General`: a released bundle completed, try to issue the next transfer;
//! - `PacketReceived`: a matching message arrived, inject one more packet.
//!
//! Sends, receives and bundle releases go out through [`Transport`]; end of
//! phase goes out through [`StreamOwner`]. Both are handed in with every
//! call as an [`EngineCtx`].

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::arena::AlgorithmHandle;
use super::collective::CollectiveOp;
use super::distribution::DistributionTable;
use super::half_ring::HalfRingState;
use super::packet::{
    BundleDestination, MemBusLane, Packet, PacketBundle, SimRequest, TransferTag,
};
use super::ring::RingState;
use super::sizing::{self, SizingInputs};
use super::stream::{Stream, StreamState};
use crate::error::{ConfigError, EngineError, SimError};
use crate::topo::{DimensionKind, NodeId, RingDirection, RingTopology};

/// Which ring variant runs a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmVariant {
    #[default]
    Ring,
    HalfRing,
}

impl AlgorithmVariant {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let compact: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .collect();
        match compact.as_str() {
            "ring" => Ok(Self::Ring),
            "halfring" => Ok(Self::HalfRing),
            _ => Err(ConfigError::InvalidValue {
                key: "algorithm".into(),
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionPolicy {
    #[default]
    Normal,
    Aggressive,
}

impl InjectionPolicy {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "normal" | "" => Ok(Self::Normal),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(ConfigError::InvalidValue {
                key: "injection_policy".into(),
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    StreamInit,
    General,
    PacketReceived,
}

/// Point-to-point transfers and bundle releases.
pub trait Transport {
    fn send(&mut self, req: SimRequest) -> Result<(), SimError>;
    /// Post a receive; `notifier` gets `PacketReceived` once it matches.
    fn recv(&mut self, req: SimRequest, notifier: AlgorithmHandle) -> Result<(), SimError>;
    fn notify(&mut self, bundle: PacketBundle) -> Result<(), SimError>;
}

/// Whoever owns the stream's lifetime.
pub trait StreamOwner {
    fn declare_ready(&mut self, stream: &mut Stream);
    fn advance_to_next_dimension(&mut self, stream: &mut Stream);
}

pub struct EngineCtx<'a> {
    pub stream: &'a mut Stream,
    pub transport: &'a mut dyn Transport,
    pub owner: &'a mut dyn StreamOwner,
    /// Handle of the instance being driven.
    pub handle: AlgorithmHandle,
}

/// Construction parameters of one algorithm instance.
#[derive(Debug, Clone)]
pub struct AlgorithmSpec {
    pub variant: AlgorithmVariant,
    pub op: CollectiveOp,
    pub ring: RingTopology,
    pub direction: RingDirection,
    pub injection: InjectionPolicy,
    pub boost_mode: bool,
    pub layer: usize,
    /// Distribution row selector; 0 means uniform traffic.
    pub non_uniform: usize,
    pub sizing: SizingInputs,
}

/// Variant-specific sizing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub stream_count: u64,
    pub msg_size: u64,
    pub parallel_reduce: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmKind {
    Ring(RingState),
    HalfRing(HalfRingState),
}

#[derive(Debug)]
pub struct Algorithm {
    kind: AlgorithmKind,
    op: CollectiveOp,
    id: NodeId,
    sender: NodeId,
    receiver: NodeId,
    layer: usize,
    enabled: bool,
    lane: MemBusLane,
    nodes_in_ring: usize,
    parallel_reduce: usize,
    stream_count: u64,
    total_stream_count: u64,
    max_count: i64,
    free_packets: usize,
    zero_latency_packets: usize,
    non_zero_latency_packets: usize,
    toggle: bool,
    processed: bool,
    send_back: bool,
    destination: BundleDestination,
    packets: VecDeque<Packet>,
    locked_packets: Vec<Packet>,
    msg_size: u64,
    final_data_size: u64,
    original_data_size: u64,
    total_packets_sent: u64,
    total_packets_received: u64,
    non_uniform: usize,
    distribution: Option<Arc<DistributionTable>>,
}

impl Algorithm {
    pub fn new(
        spec: AlgorithmSpec,
        data_size: u64,
        distribution: Option<Arc<DistributionTable>>,
    ) -> Result<Self, ConfigError> {
        let n = spec.ring.nodes_in_ring();
        let id = spec.ring.id;

        let skewed = if spec.non_uniform > 0 {
            let table = distribution.as_ref().ok_or(ConfigError::MissingDistribution)?;
            table.skew(spec.non_uniform, id, data_size)?
        } else {
            data_size
        };

        let (kind, plan) = match spec.variant {
            AlgorithmVariant::Ring => {
                let st = RingState::new(spec.sizing.total_nodes);
                let plan = st.plan(&spec, skewed);
                (AlgorithmKind::Ring(st), plan)
            }
            AlgorithmVariant::HalfRing => {
                let st = HalfRingState::new(spec.sizing);
                let plan = st.plan(&spec, skewed)?;
                (AlgorithmKind::HalfRing(st), plan)
            }
        };

        let max_count = match spec.op {
            CollectiveOp::Alltoall | CollectiveOp::Allgather => 0,
            _ => n as i64 - 1,
        };
        let lane = if spec.ring.kind == DimensionKind::Local {
            MemBusLane::Fast
        } else {
            MemBusLane::Usual
        };
        let enabled = !spec.boost_mode || spec.ring.is_enabled();

        debug!(
            node = id.0,
            dim = spec.ring.dim,
            variant = ?spec.variant,
            op = %spec.op,
            stream_count = plan.stream_count,
            msg_size = plan.msg_size,
            parallel_reduce = plan.parallel_reduce,
            enabled,
            "algorithm instance"
        );

        Ok(Self {
            kind,
            op: spec.op,
            id,
            sender: spec.ring.sender(spec.direction),
            receiver: spec.ring.receiver(spec.direction),
            layer: spec.layer,
            enabled,
            lane,
            nodes_in_ring: n,
            parallel_reduce: plan.parallel_reduce,
            stream_count: plan.stream_count,
            total_stream_count: plan.stream_count,
            max_count,
            free_packets: 0,
            zero_latency_packets: 0,
            non_zero_latency_packets: 0,
            toggle: false,
            processed: false,
            send_back: false,
            destination: BundleDestination::AcceleratorMemory,
            packets: VecDeque::new(),
            locked_packets: Vec::new(),
            msg_size: plan.msg_size,
            final_data_size: sizing::final_data_size(spec.op, n, data_size),
            original_data_size: data_size,
            total_packets_sent: 0,
            total_packets_received: 0,
            non_uniform: spec.non_uniform,
            distribution,
        })
    }

    pub fn kind(&self) -> &AlgorithmKind {
        &self.kind
    }

    pub fn stream_count(&self) -> u64 {
        self.stream_count
    }

    pub fn total_stream_count(&self) -> u64 {
        self.total_stream_count
    }

    pub fn msg_size(&self) -> u64 {
        self.msg_size
    }

    pub fn final_data_size(&self) -> u64 {
        self.final_data_size
    }

    pub fn parallel_reduce(&self) -> usize {
        self.parallel_reduce
    }

    pub fn free_packets(&self) -> usize {
        self.free_packets
    }

    pub fn max_count(&self) -> i64 {
        self.max_count
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn total_packets_sent(&self) -> u64 {
        self.total_packets_sent
    }

    pub fn total_packets_received(&self) -> u64 {
        self.total_packets_received
    }

    pub fn run(&mut self, event: EngineEvent, ctx: &mut EngineCtx<'_>) -> Result<(), SimError> {
        match event {
            EngineEvent::General => {
                self.free_packets += 1;
                self.ready(ctx)?;
                self.iteratable(ctx);
            }
            EngineEvent::PacketReceived => {
                self.total_packets_received += 1;
                self.insert_packet(ctx)?;
            }
            EngineEvent::StreamInit => {
                if !self.enabled {
                    // Nothing moves on a boosted-away ring.
                    self.exit(ctx);
                    return Ok(());
                }
                for _ in 0..self.parallel_reduce {
                    self.insert_packet(ctx)?;
                }
            }
        }
        Ok(())
    }

    fn next_packet(&mut self, vnet: usize) -> Packet {
        match &mut self.kind {
            AlgorithmKind::Ring(st) if self.op == CollectiveOp::Alltoall => {
                let (src, dst) = st.next_pairwise_peers(self.id);
                Packet { vnet, src, dst }
            }
            _ => Packet {
                vnet,
                src: self.sender,
                dst: self.receiver,
            },
        }
    }

    pub fn insert_packet(&mut self, ctx: &mut EngineCtx<'_>) -> Result<(), SimError> {
        if !self.enabled {
            return Ok(());
        }
        if self.zero_latency_packets == 0 && self.non_zero_latency_packets == 0 {
            self.zero_latency_packets = self.parallel_reduce;
            self.non_zero_latency_packets =
                self.nodes_in_ring.saturating_sub(1) * self.parallel_reduce;
            self.toggle = !self.toggle;
        }
        let vnet = ctx.stream.current.map(|p| p.queue_id).unwrap_or(0);

        if self.zero_latency_packets > 0 {
            let packet = self.next_packet(vnet);
            self.packets.push_back(packet);
            self.locked_packets.push(packet);
            self.processed = false;
            self.send_back = false;
            self.destination = BundleDestination::AcceleratorMemory;
            self.process_max_count(ctx)?;
            self.zero_latency_packets -= 1;
            return Ok(());
        }
        if self.non_zero_latency_packets > 0 {
            let packet = self.next_packet(vnet);
            self.packets.push_back(packet);
            self.locked_packets.push(packet);
            self.processed = self.op == CollectiveOp::Reducescatter
                || (self.op == CollectiveOp::Allreduce && self.toggle);
            self.send_back = self.non_zero_latency_packets > self.parallel_reduce;
            self.destination = BundleDestination::ComputeUnit;
            self.process_max_count(ctx)?;
            self.non_zero_latency_packets -= 1;
            return Ok(());
        }
        Err(EngineError::NothingToInject {
            stream: ctx.stream.id.0,
        }
        .into())
    }

    fn process_max_count(&mut self, ctx: &mut EngineCtx<'_>) -> Result<(), SimError> {
        self.max_count -= 1;
        self.release_packets(ctx)
    }

    fn release_packets(&mut self, ctx: &mut EngineCtx<'_>) -> Result<(), SimError> {
        let bundle = PacketBundle {
            node: self.id,
            stream: ctx.stream.id,
            packets: std::mem::take(&mut self.locked_packets),
            processed: self.processed,
            send_back: self.send_back,
            msg_size: self.msg_size,
            lane: self.lane,
            destination: self.destination,
            notifier: ctx.handle,
        };
        trace!(
            node = self.id.0,
            stream = ctx.stream.id.0,
            packets = bundle.packets.len(),
            destination = ?bundle.destination,
            "release bundle"
        );
        ctx.transport.notify(bundle)
    }

    /// Issue the next transfer if a packet and a free slot are available.
    pub fn ready(&mut self, ctx: &mut EngineCtx<'_>) -> Result<bool, SimError> {
        if matches!(ctx.stream.state, StreamState::Created | StreamState::Ready) {
            ctx.stream.change_state(StreamState::Executing);
        }
        if !self.enabled || self.stream_count == 0 || self.free_packets == 0 {
            return Ok(false);
        }
        let Some(&packet) = self.packets.front() else {
            return Ok(false);
        };
        let tag = TransferTag {
            stream: ctx.stream.id,
            vnet: packet.vnet,
        };
        ctx.transport.send(SimRequest {
            src: self.id,
            dst: packet.dst,
            size_bytes: self.msg_size,
            tag,
            layer: self.layer,
        })?;
        let recv_size = if self.non_uniform > 0 {
            self.recv_size(packet.src)?
        } else {
            self.msg_size
        };
        ctx.transport.recv(
            SimRequest {
                src: packet.src,
                dst: self.id,
                size_bytes: recv_size,
                tag,
                layer: self.layer,
            },
            ctx.handle,
        )?;
        self.reduce(ctx);
        Ok(true)
    }

    fn recv_size(&self, src: NodeId) -> Result<u64, ConfigError> {
        let table = self
            .distribution
            .as_ref()
            .ok_or(ConfigError::MissingDistribution)?;
        let src_data = table.skew(self.non_uniform, src, self.original_data_size)?;
        Ok(match &self.kind {
            AlgorithmKind::Ring(st) => st.recv_size(src_data),
            AlgorithmKind::HalfRing(st) => st.recv_size(src_data),
        })
    }

    fn reduce(&mut self, ctx: &mut EngineCtx<'_>) {
        self.process_stream_count(ctx);
        self.packets.pop_front();
        self.free_packets -= 1;
        self.total_packets_sent += 1;
    }

    fn process_stream_count(&mut self, ctx: &mut EngineCtx<'_>) {
        if self.stream_count > 0 {
            self.stream_count -= 1;
        }
        if self.stream_count == 0 && !ctx.stream.is_dead() {
            ctx.stream.change_state(StreamState::Zombie);
        }
    }

    /// False once every message is sent and every slot is back; exits then.
    pub fn iteratable(&mut self, ctx: &mut EngineCtx<'_>) -> bool {
        if self.stream_count == 0 && self.free_packets == self.parallel_reduce {
            self.exit(ctx);
            return false;
        }
        true
    }

    fn exit(&mut self, ctx: &mut EngineCtx<'_>) {
        self.packets.clear();
        self.locked_packets.clear();
        debug!(
            node = self.id.0,
            stream = ctx.stream.id.0,
            sent = self.total_packets_sent,
            received = self.total_packets_received,
            "phase done"
        );
        ctx.owner.declare_ready(ctx.stream);
        ctx.owner.advance_to_next_dimension(ctx.stream);
    }
}
