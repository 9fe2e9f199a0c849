//! Error types shared by the topology, engine and routing layers.
//!
//! Every error here is fatal for a simulation run: callers propagate it
//! with `?` and the harness aborts instead of producing silently wrong
//! results.

use std::path::PathBuf;

use thiserror::Error;

use crate::topo::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("torus must have at least one dimension")]
    NoDimensions,
    #[error("dimension {dim} has zero extent")]
    ZeroExtent { dim: usize },
    #[error("dimension index {dim} out of range for a {dims}-dimensional torus")]
    DimensionOutOfRange { dim: usize, dims: usize },
    #[error("node {id:?} out of range for a torus of {nodes} nodes")]
    NodeOutOfRange { id: NodeId, nodes: usize },
    #[error("coordinate list has {got} entries, torus has {dims} dimensions")]
    CoordinateArity { got: usize, dims: usize },
    #[error("coordinate {value} out of range in dimension {dim} (extent {extent})")]
    CoordinateOutOfRange {
        dim: usize,
        value: usize,
        extent: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line {line}: {msg}")]
    SystemFile { line: usize, msg: String },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("failed link {a:?}-{b:?} is not a single-hop torus link")]
    NotALink { a: NodeId, b: NodeId },
    #[error("link failure in a two-node ring (dimension {dim})")]
    TwoNodeRingFailure { dim: usize },
    #[error("too many link failures ({count}) in the ring of dimension {dim}")]
    TooManyRingFailures { dim: usize, count: usize },
    #[error("adaptive routing supports at most two failed links, got {0}")]
    TooManyFailures(usize),
    #[error("routing algorithm {algo} needs exactly {expected} failed link(s), got {got}")]
    FailureCountMismatch {
        algo: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("adaptive routing supports at most three dimensions, got {0}")]
    TooManyDimensions(usize),
    #[error("failure-aware sizing needs at least two nodes in the failed ring, got {0}")]
    FailedRingTooSmall(usize),
    #[error("link failure counts list has {got} entries, torus has {dims} dimensions")]
    FailureCountArity { got: usize, dims: usize },
    #[error("{algo} does not implement {op}")]
    UnsupportedCollective {
        algo: &'static str,
        op: &'static str,
    },
    #[error("non-uniform traffic requires a distribution table")]
    MissingDistribution,
    #[error("distribution file {path}: {msg}")]
    Distribution { path: PathBuf, msg: String },
    #[error("distribution table has no row {row}")]
    DistributionRow { row: usize },
    #[error("distribution table row {row} has no column {col}")]
    DistributionColumn { row: usize, col: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("unknown direction index {0}")]
    UnknownDirection(i32),
    #[error("nodes {a:?} and {b:?} differ in more than one dimension")]
    NotAligned { a: NodeId, b: NodeId },
    #[error("no fault-free detour from {src:?} to {dst:?}")]
    NoDetour { src: NodeId, dst: NodeId },
    #[error("node {current:?} is not on the planned path {src:?} -> {dst:?}")]
    OffPath {
        current: NodeId,
        src: NodeId,
        dst: NodeId,
    },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("stream {stream}: asked to inject with no free slot and no pending work")]
    NothingToInject { stream: u64 },
    #[error("algorithm handle {index}:{generation} is stale")]
    StaleHandle { index: usize, generation: u64 },
    #[error("unknown stream {0}")]
    UnknownStream(u64),
}

/// Top-level error for a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
