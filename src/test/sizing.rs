//! Failure-aware sizing against hand-computed values
//! (1 MiB per node, square 2-D torus, one failure in the ring).

use crate::cc::collective::CollectiveOp;
use crate::cc::sizing::{
    SizingInputs, final_data_size, half_ring_msg_size, half_ring_stream_count, ring_msg_size,
    ring_recv_size, ring_stream_count,
};
use crate::error::ConfigError;
use crate::fault::{FailureType, LinkFailureScheduling};

const MIB: u64 = 1_048_576;

fn inputs(n: usize, failures: usize, scheduling: LinkFailureScheduling, stage: usize) -> SizingInputs {
    SizingInputs {
        op: CollectiveOp::Alltoall,
        dim: 1,
        nodes_in_ring: n,
        total_nodes: n * n,
        dims: 2,
        max_extent: n,
        failures_in_dim: failures,
        failed_ring_nodes: n,
        scheduling,
        failure_type: FailureType(0),
        chunk_stage: stage,
    }
}

const BASE: usize = 0;
const ACCEL: usize = 1;

#[test]
fn golden_message_sizes() {
    use LinkFailureScheduling::{Mate, MateEnhanced};
    let cases = [
        (MateEnhanced, 8, ACCEL, 73_071),
        (MateEnhanced, 5, ACCEL, 111_848),
        (Mate, 8, ACCEL, 102_300),
        (Mate, 5, ACCEL, 159_783),
        (MateEnhanced, 8, BASE, 37_450),
        (MateEnhanced, 5, BASE, 62_915),
        (Mate, 8, BASE, 131_072),
    ];
    for (scheduling, n, stage, expected) in cases {
        let p = inputs(n, 1, scheduling, stage);
        assert_eq!(
            half_ring_msg_size(&p, MIB),
            expected,
            "{scheduling:?} n={n} stage={stage}"
        );
    }
}

#[test]
fn accelerated_message_size_in_three_dimensions() {
    let mut p = inputs(4, 0, LinkFailureScheduling::Mate, ACCEL);
    p.dims = 3;
    p.total_nodes = 64;
    assert_eq!(half_ring_msg_size(&p, MIB), 113_359);
}

#[test]
fn baseline_and_multi_failure_fall_back_to_even_split() {
    let p = inputs(8, 1, LinkFailureScheduling::Baseline, ACCEL);
    assert_eq!(half_ring_msg_size(&p, MIB), MIB / 8);
    let p = inputs(8, 2, LinkFailureScheduling::MateEnhanced, BASE);
    assert_eq!(half_ring_msg_size(&p, MIB), MIB / 8);
}

#[test]
fn half_ring_stream_counts() {
    use LinkFailureScheduling::{Baseline, Mate, MateEnhanced};
    let cases = [
        (8, 0, Baseline, BASE, 16),
        (5, 0, Baseline, BASE, 6),
        (2, 0, Baseline, BASE, 2),
        (8, 1, Baseline, BASE, 28),
        (5, 1, Baseline, BASE, 10),
        (8, 1, MateEnhanced, ACCEL, 16),
        (5, 1, MateEnhanced, ACCEL, 6),
        // base period: Mate resizes to the largest ring, MateEnhanced keeps
        // the failed-ring count
        (8, 0, Mate, BASE, 16),
        (8, 1, MateEnhanced, BASE, 28),
    ];
    for (n, f, scheduling, stage, expected) in cases {
        let p = inputs(n, f, scheduling, stage);
        assert_eq!(
            half_ring_stream_count(&p).unwrap(),
            expected,
            "n={n} f={f} {scheduling:?} stage={stage}"
        );
    }
}

#[test]
fn half_ring_rejects_unsupported_rings() {
    let p = inputs(2, 1, LinkFailureScheduling::Baseline, BASE);
    assert!(matches!(
        half_ring_stream_count(&p),
        Err(ConfigError::TwoNodeRingFailure { dim: 1 })
    ));
    let p = inputs(8, 3, LinkFailureScheduling::Baseline, BASE);
    assert!(matches!(
        half_ring_stream_count(&p),
        Err(ConfigError::TooManyRingFailures { dim: 1, count: 3 })
    ));
    let mut p = inputs(8, 0, LinkFailureScheduling::Baseline, BASE);
    p.op = CollectiveOp::Allreduce;
    assert!(matches!(
        half_ring_stream_count(&p),
        Err(ConfigError::UnsupportedCollective { algo: "half_ring", .. })
    ));
}

#[test]
fn ring_sizes_per_collective() {
    // 4-node ring in a 16-node torus
    assert_eq!(ring_stream_count(CollectiveOp::Allreduce, 4, 16), 6);
    assert_eq!(ring_stream_count(CollectiveOp::Reducescatter, 4, 16), 3);
    assert_eq!(ring_stream_count(CollectiveOp::Allgather, 4, 16), 3);
    assert_eq!(ring_stream_count(CollectiveOp::Alltoall, 8, 8), 7);
    assert_eq!(ring_msg_size(CollectiveOp::Allreduce, 4, 16, 1000), 250);
    assert_eq!(ring_msg_size(CollectiveOp::Allgather, 4, 16, 1000), 1000);
    assert_eq!(ring_recv_size(16, 3200), 200);
    assert_eq!(final_data_size(CollectiveOp::Allreduce, 4, 1000), 1000);
    // single-node ring never divides by zero
    assert_eq!(ring_stream_count(CollectiveOp::Allreduce, 1, 1), 0);
    assert_eq!(final_data_size(CollectiveOp::Reducescatter, 0, 7), 7);
}

#[test]
fn accelerated_and_base_are_exclusive_under_mate() {
    let accel = inputs(8, 1, LinkFailureScheduling::Mate, ACCEL);
    assert!(accel.accelerated() && !accel.base());
    let base = inputs(8, 1, LinkFailureScheduling::Mate, BASE);
    assert!(!base.accelerated() && base.base());
    let none = inputs(8, 1, LinkFailureScheduling::Baseline, ACCEL);
    assert!(!none.accelerated() && !none.base());
}
