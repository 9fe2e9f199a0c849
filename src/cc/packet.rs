//! Packets, bundles and point-to-point requests produced by the engine.

use serde::Serialize;

use super::arena::AlgorithmHandle;
use super::stream::StreamId;
use crate::topo::NodeId;

/// Matches a send with its receive: same stream, same phase queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransferTag {
    pub stream: StreamId,
    pub vnet: usize,
}

/// One logical transfer slot: where to send, where to receive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub vnet: usize,
    pub src: NodeId,
    pub dst: NodeId,
}

/// Memory-bus lane a bundle travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemBusLane {
    /// First (local) dimension.
    Fast,
    Usual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleDestination {
    AcceleratorMemory,
    ComputeUnit,
}

/// Batch of packets released to the transport in one go.
#[derive(Debug, Clone)]
pub struct PacketBundle {
    pub node: NodeId,
    pub stream: StreamId,
    pub packets: Vec<Packet>,
    pub processed: bool,
    pub send_back: bool,
    pub msg_size: u64,
    pub lane: MemBusLane,
    pub destination: BundleDestination,
    pub notifier: AlgorithmHandle,
}

/// Point-to-point send or receive issued by an algorithm instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimRequest {
    pub src: NodeId,
    pub dst: NodeId,
    pub size_bytes: u64,
    pub tag: TransferTag,
    pub layer: usize,
}
