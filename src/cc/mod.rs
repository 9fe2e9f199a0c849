//! Collective communication engine.

pub mod algorithm;
pub mod arena;
pub mod collective;
pub mod distribution;
pub mod half_ring;
pub mod packet;
pub mod ring;
pub mod scheduler;
pub mod sizing;
pub mod stream;

pub use algorithm::{
    Algorithm, AlgorithmKind, AlgorithmSpec, AlgorithmVariant, EngineCtx, EngineEvent,
    InjectionPolicy, StreamOwner, Transport,
};
pub use arena::{AlgorithmHandle, Arena};
pub use collective::CollectiveOp;
pub use distribution::DistributionTable;
pub use packet::{BundleDestination, MemBusLane, Packet, PacketBundle, SimRequest, TransferTag};
pub use scheduler::{DimensionScheduler, InterDimensionScheduling};
pub use sizing::SizingInputs;
pub use stream::{Phase, Stream, StreamId, StreamState};
