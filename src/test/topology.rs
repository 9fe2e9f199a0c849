use crate::error::{ConfigError, TopologyError};
use crate::fault::{FailedLink, FaultRegistry};
use crate::topo::{NodeId, RingDirection, Sign, TorusShape};

fn link(a: usize, b: usize) -> FailedLink {
    FailedLink::new(NodeId(a), NodeId(b))
}

#[test]
fn ring_views_cover_every_node_once_per_dimension() {
    let shape = TorusShape::new(vec![4, 3, 2]).unwrap();
    for dim in 0..shape.dims() {
        let mut seen = vec![0usize; shape.len()];
        for id in shape.node_ids() {
            let ring = shape.ring(id, dim).unwrap();
            assert_eq!(ring.nodes_in_ring(), shape.extents()[dim]);
            assert_eq!(ring.offset(), shape.strides()[dim]);
            // walking the full ring returns to the start
            let mut at = id;
            for _ in 0..ring.nodes_in_ring() {
                at = shape.ring(at, dim).unwrap().receiver(RingDirection::Clockwise);
            }
            assert_eq!(at, id);
            if ring.index_in_ring() == 0 {
                for m in shape.members(id, dim).unwrap() {
                    seen[m.0] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&c| c == 1), "dim {dim}: {seen:?}");
    }
}

#[test]
fn receiver_matches_positive_neighbor() {
    let shape = TorusShape::new(vec![3, 5]).unwrap();
    for id in shape.node_ids() {
        for dim in 0..2 {
            let ring = shape.ring(id, dim).unwrap();
            assert_eq!(
                ring.receiver(RingDirection::Clockwise),
                shape.neighbor(id, dim, Sign::Positive).unwrap()
            );
            assert_eq!(
                ring.sender(RingDirection::Clockwise),
                shape.neighbor(id, dim, Sign::Negative).unwrap()
            );
        }
    }
}

#[test]
fn out_of_range_queries_are_errors() {
    let shape = TorusShape::new(vec![4, 4]).unwrap();
    assert_eq!(
        shape.to_coordinates(NodeId(16)).unwrap_err(),
        TopologyError::NodeOutOfRange {
            id: NodeId(16),
            nodes: 16
        }
    );
    assert_eq!(
        shape.ring(NodeId(0), 2).unwrap_err(),
        TopologyError::DimensionOutOfRange { dim: 2, dims: 2 }
    );
    assert!(matches!(
        shape.to_id(&[1, 4]),
        Err(TopologyError::CoordinateOutOfRange { dim: 1, value: 4, extent: 4 })
    ));
    assert!(matches!(
        shape.to_id(&[1]),
        Err(TopologyError::CoordinateArity { got: 1, dims: 2 })
    ));
}

#[test]
fn registry_counts_failures_per_dimension() {
    let shape = TorusShape::new(vec![4, 5]).unwrap();
    // 0-1 along dim 0, 4-0 wraps dim 1 (coords (0,1) and (0,0))
    let reg = FaultRegistry::new(&shape, vec![link(0, 1), link(4, 0), link(1, 0)]).unwrap();
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.failures_in_dimension(0), 1);
    assert_eq!(reg.failures_in_dimension(1), 1);
    assert_eq!(reg.failed_ring_nodes(), 5);
    assert!(reg.contains(NodeId(1), NodeId(0)));
    assert_eq!(reg.link_dimension(&link(0, 4)), Some(1));

    assert!(reg.ring_through_has_fault(NodeId(2), 0).unwrap());
    assert!(!reg.ring_through_has_fault(NodeId(5), 0).unwrap());
    assert!(reg.ring_has_fault(NodeId(16), NodeId(0)).unwrap());
    assert!(!reg.ring_has_fault(NodeId(1), NodeId(5)).unwrap());
}

#[test]
fn wraparound_link_is_a_single_hop() {
    let shape = TorusShape::new(vec![5]).unwrap();
    let reg = FaultRegistry::new(&shape, vec![link(4, 0)]).unwrap();
    assert_eq!(reg.failures_in_dimension(0), 1);
}

#[test]
fn non_adjacent_failed_link_is_rejected() {
    let shape = TorusShape::new(vec![4, 4]).unwrap();
    assert!(matches!(
        FaultRegistry::new(&shape, vec![link(0, 2)]),
        Err(ConfigError::NotALink { .. })
    ));
    assert!(matches!(
        FaultRegistry::new(&shape, vec![link(0, 5)]),
        Err(ConfigError::NotALink { .. })
    ));
    assert!(matches!(
        FaultRegistry::new(&shape, vec![link(0, 99)]),
        Err(ConfigError::Topology(TopologyError::NodeOutOfRange { .. }))
    ));
}

#[test]
fn dimension_counts_override_for_sizing_studies() {
    let shape = TorusShape::new(vec![8, 4]).unwrap();
    let reg = FaultRegistry::healthy(&shape)
        .with_dimension_counts(vec![0, 1])
        .unwrap();
    assert!(reg.is_empty());
    assert_eq!(reg.failures_in_dimension(1), 1);
    assert_eq!(reg.failed_ring_nodes(), 4);
    assert_eq!(reg.clone().with_failed_ring_nodes(6).failed_ring_nodes(), 6);
    assert!(matches!(
        reg.with_dimension_counts(vec![1]),
        Err(ConfigError::FailureCountArity { got: 1, dims: 2 })
    ));
}
