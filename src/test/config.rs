use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cc::{AlgorithmVariant, CollectiveOp, InjectionPolicy, InterDimensionScheduling};
use crate::config::{RoutingChoice, SimConfig};
use crate::error::ConfigError;
use crate::fault::{FailedLink, FailureType, LinkFailureScheduling, SchedulePolicy};
use crate::route::RoutingAlgorithm;
use crate::topo::{NodeId, RingDirection};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "torus-ccsim-config-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn base(dims: &[usize]) -> SimConfig {
    SimConfig {
        dims: dims.to_vec(),
        ..SimConfig::default()
    }
}

#[test]
fn json_fills_defaults() {
    let cfg = SimConfig::from_json_str(r#"{ "dims": [4, 4] }"#).unwrap();
    assert_eq!(cfg.dims, vec![4, 4]);
    assert_eq!(cfg.collective, CollectiveOp::Allreduce);
    assert_eq!(cfg.data_bytes, 1 << 20);
    assert_eq!(cfg.algorithm, AlgorithmVariant::Ring);
    assert_eq!(cfg.splits, 1);
    assert_eq!(cfg.routing, RoutingChoice::Auto);
    assert_eq!(cfg.link_latency_ns, 100);
    assert_eq!(cfg.endpoint_delay_ns, 10);
    assert!(cfg.failed_links.is_empty());
    assert_eq!(cfg, base(&[4, 4]));
}

#[test]
fn json_reads_every_knob() {
    let cfg = SimConfig::from_json_str(
        r#"{
            "dims": [8, 8],
            "collective": "all-to-all",
            "data_bytes": 4096,
            "algorithm": "half_ring",
            "injection_policy": "aggressive",
            "direction": "anticlockwise",
            "inter_dimension_scheduling": "nd_torus_ring_all_to_all_all_reduce",
            "link_failure_scheduling": "mate_enhanced",
            "failure_type": 4,
            "failed_links": [[9, 1]],
            "routing": "sandwich",
            "splits": 2,
            "boost_mode": true
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.collective, CollectiveOp::Alltoall);
    assert_eq!(cfg.algorithm, AlgorithmVariant::HalfRing);
    assert_eq!(cfg.injection_policy, InjectionPolicy::Aggressive);
    assert_eq!(cfg.direction, RingDirection::Anticlockwise);
    assert_eq!(
        cfg.inter_dimension_scheduling,
        InterDimensionScheduling::NdTorusRingAllToAllAllReduce
    );
    assert_eq!(cfg.link_failure_scheduling, LinkFailureScheduling::MateEnhanced);
    assert_eq!(cfg.failure_type, FailureType(4));
    assert_eq!(cfg.failed_links, vec![FailedLink::new(NodeId(1), NodeId(9))]);
    assert_eq!(cfg.routing, RoutingChoice::Sandwich);
    assert!(cfg.boost_mode);
}

#[test]
fn json_without_dims_is_rejected() {
    assert!(matches!(
        SimConfig::from_json_str(r#"{ "collective": "allreduce" }"#),
        Err(ConfigError::Json(_))
    ));
    assert!(matches!(
        SimConfig::from_json_str(r#"{ "dims": [4], "collective": "broadcast" }"#),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn system_text_overrides_fields() {
    let mut cfg = base(&[2]);
    cfg.apply_system_str(
        "# torus run\n\
         dims: 4_4\n\
         \n\
         collective: all-to-all\n\
         all-to-all-implementation: halfRing_halfRing\n\
         link_failure_per_dimension: 0 1   # y only\n\
         link-failure-scheduling: mate\n\
         failure-type: 1\n\
         boost-mode: 1\n\
         routing: sandwich2\n\
         preferred-dataset-splits: 4\n\
         endpoint-delay: 25\n\
         scheduling-policy: LIFO\n",
    )
    .unwrap();
    assert_eq!(cfg.dims, vec![4, 4]);
    assert_eq!(cfg.collective, CollectiveOp::Alltoall);
    assert_eq!(cfg.algorithm, AlgorithmVariant::HalfRing);
    assert_eq!(cfg.link_failure_per_dimension, Some(vec![0, 1]));
    assert_eq!(cfg.link_failure_scheduling, LinkFailureScheduling::Mate);
    assert_eq!(cfg.failure_type, FailureType(1));
    assert!(cfg.boost_mode);
    assert_eq!(cfg.routing, RoutingChoice::Sandwiches);
    assert_eq!(cfg.splits, 4);
    assert_eq!(cfg.endpoint_delay_ns, 25);
}

#[test]
fn system_text_errors_carry_line_numbers() {
    let mut cfg = base(&[4]);
    assert!(matches!(
        cfg.apply_system_str("dims: 4\nalgorithm: ring_halfRing\n"),
        Err(ConfigError::SystemFile { line: 2, .. })
    ));
    assert!(matches!(
        cfg.apply_system_str("dims: 4\nno separator here\n"),
        Err(ConfigError::SystemFile { line: 2, .. })
    ));
    assert!(matches!(
        cfg.apply_system_str("dims: 4_x\n"),
        Err(ConfigError::SystemFile { line: 1, .. })
    ));
    assert!(matches!(
        cfg.apply_system_str("boost-mode: maybe\n"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        cfg.apply_system_str("direction: sideways\n"),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn system_and_json_files_load_from_disk() {
    let json = temp_file("run.json", r#"{ "dims": [4, 4], "data_bytes": 1024 }"#);
    let sys = temp_file("system.txt", "collective: reduce_scatter\n");
    let mut cfg = SimConfig::load_json(&json).unwrap();
    cfg.apply_system_file(&sys).unwrap();
    assert_eq!(cfg.data_bytes, 1024);
    assert_eq!(cfg.collective, CollectiveOp::Reducescatter);

    assert!(matches!(
        SimConfig::load_json(&json.with_file_name("missing.json")),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn routing_choice_resolves_by_failure_count() {
    assert_eq!(RoutingChoice::parse("").unwrap(), RoutingChoice::Auto);
    assert_eq!(RoutingChoice::parse("DORMIN").unwrap(), RoutingChoice::Dormin);
    assert!(RoutingChoice::parse("xy").is_err());
    assert_eq!(
        RoutingChoice::Auto.resolve(2).unwrap(),
        RoutingAlgorithm::Sandwiches
    );
    assert_eq!(
        RoutingChoice::Dormin.resolve(1).unwrap(),
        RoutingAlgorithm::Dormin
    );
}

#[test]
fn validate_builds_router_and_scheduler() {
    let mut cfg = base(&[4, 4]);
    cfg.failed_links = vec![FailedLink::new(NodeId(0), NodeId(1))];
    cfg.link_failure_scheduling = LinkFailureScheduling::Mate;
    let setup = cfg.validate().unwrap();
    assert_eq!(setup.shape.len(), 16);
    assert_eq!(setup.faults.len(), 1);
    assert_eq!(setup.router.algorithm(), RoutingAlgorithm::Sandwich);
    assert_eq!(setup.scheduler.policy(), SchedulePolicy::Paired);
    assert!(setup.distribution.is_none());

    // an explicit choice wins over the failure count
    let mut cfg = base(&[4, 4]);
    cfg.failed_links = vec![FailedLink::new(NodeId(0), NodeId(1))];
    cfg.routing = RoutingChoice::Dormin;
    assert_eq!(
        cfg.validate().unwrap().router.algorithm(),
        RoutingAlgorithm::Dormin
    );
}

#[test]
fn validate_rejects_bad_shapes_and_values() {
    assert!(matches!(base(&[]).validate(), Err(ConfigError::Topology(_))));

    let mut cfg = base(&[4]);
    cfg.splits = 0;
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })));

    let mut cfg = base(&[4]);
    cfg.link_gbps = 0.0;
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })));

    let mut cfg = base(&[4, 4]);
    cfg.algorithm = AlgorithmVariant::HalfRing;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::UnsupportedCollective { algo: "half_ring", .. })
    ));

    assert!(matches!(base(&[2, 2, 2, 2]).validate(), Err(ConfigError::TooManyDimensions(4))));
}

#[test]
fn validate_rejects_unsupported_failures() {
    let mut cfg = base(&[2, 4]);
    cfg.failed_links = vec![FailedLink::new(NodeId(0), NodeId(1))];
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::TwoNodeRingFailure { dim: 0 })
    ));

    let mut cfg = base(&[4, 4]);
    cfg.failed_links = [(0, 1), (4, 5), (8, 9)]
        .iter()
        .map(|&(a, b)| FailedLink::new(NodeId(a), NodeId(b)))
        .collect();
    assert!(matches!(cfg.validate(), Err(ConfigError::TooManyFailures(3))));

    let mut cfg = base(&[4, 4]);
    cfg.failed_links = vec![FailedLink::new(NodeId(0), NodeId(2))];
    assert!(matches!(cfg.validate(), Err(ConfigError::NotALink { .. })));

    let mut cfg = base(&[4, 4]);
    cfg.collective = CollectiveOp::Alltoall;
    cfg.algorithm = AlgorithmVariant::HalfRing;
    cfg.link_failure_scheduling = LinkFailureScheduling::Mate;
    cfg.link_failure_per_dimension = Some(vec![1, 0]);
    cfg.failed_ring_nodes = Some(1);
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::FailedRingTooSmall(1))
    ));

    let mut cfg = base(&[4, 4]);
    cfg.link_failure_per_dimension = Some(vec![1]);
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::FailureCountArity { got: 1, dims: 2 })
    ));
}

#[test]
fn non_uniform_traffic_needs_a_table_row() {
    let mut cfg = base(&[4]);
    cfg.non_uniform = 1;
    assert!(matches!(cfg.validate(), Err(ConfigError::MissingDistribution)));

    let table = temp_file("dist.txt", "[8192,8192,8192,8192,8192,8192,8192,16384]\n\n");
    let mut cfg = base(&[4]);
    cfg.non_uniform = 2;
    cfg.distribution_file = Some(table.clone());
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::DistributionRow { row: 1 })
    ));

    let mut cfg = base(&[4]);
    cfg.non_uniform = 1;
    cfg.distribution_file = Some(table);
    let setup = cfg.validate().unwrap();
    assert_eq!(setup.distribution.map(|t| t.rows()), Some(1));
}
