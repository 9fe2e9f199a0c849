//! Run configuration.
//!
//! A [`SimConfig`] comes from a JSON file, from the `key: value` system
//! text format, or both (system lines are applied on top of the JSON
//! base). [`SimConfig::validate`] checks it against the torus and builds
//! the shared pieces of a run as a [`SimSetup`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cc::{
    AlgorithmVariant, CollectiveOp, DimensionScheduler, DistributionTable, InjectionPolicy,
    InterDimensionScheduling,
};
use crate::error::ConfigError;
use crate::fault::{FailedLink, FailureType, FaultRegistry, LinkFailureScheduling};
use crate::route::{AdaptiveRouter, RoutingAlgorithm};
use crate::topo::{RingDirection, TorusShape};

/// Routing algorithm selection; `Auto` picks by the number of failed links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingChoice {
    #[default]
    Auto,
    Dormin,
    Sandwich,
    Sandwiches,
}

impl RoutingChoice {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "dormin" => Ok(Self::Dormin),
            "sandwich" => Ok(Self::Sandwich),
            "sandwiches" | "sandwich2" => Ok(Self::Sandwiches),
            _ => Err(ConfigError::InvalidValue {
                key: "routing".into(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn resolve(self, failures: usize) -> Result<RoutingAlgorithm, ConfigError> {
        match self {
            Self::Auto => RoutingAlgorithm::for_failures(failures),
            Self::Dormin => Ok(RoutingAlgorithm::Dormin),
            Self::Sandwich => Ok(RoutingAlgorithm::Sandwich),
            Self::Sandwiches => Ok(RoutingAlgorithm::Sandwiches),
        }
    }
}

fn default_collective() -> CollectiveOp {
    CollectiveOp::Allreduce
}

fn default_data_bytes() -> u64 {
    1 << 20
}

fn default_splits() -> u64 {
    1
}

fn default_link_latency_ns() -> u64 {
    100
}

fn default_link_gbps() -> f64 {
    100.0
}

fn default_endpoint_delay_ns() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Torus extents, dimension 0 first.
    pub dims: Vec<usize>,
    #[serde(default = "default_collective")]
    pub collective: CollectiveOp,
    /// Bytes held by every node when the collective starts.
    #[serde(default = "default_data_bytes")]
    pub data_bytes: u64,
    #[serde(default)]
    pub algorithm: AlgorithmVariant,
    #[serde(default)]
    pub injection_policy: InjectionPolicy,
    #[serde(default)]
    pub direction: RingDirection,
    #[serde(default)]
    pub inter_dimension_scheduling: InterDimensionScheduling,
    #[serde(default)]
    pub link_failure_scheduling: LinkFailureScheduling,
    #[serde(default)]
    pub failure_type: FailureType,
    #[serde(default)]
    pub failed_links: Vec<FailedLink>,
    /// Per-dimension failure counts; overrides the counts derived from
    /// `failed_links` for sizing.
    #[serde(default)]
    pub link_failure_per_dimension: Option<Vec<usize>>,
    #[serde(default)]
    pub failed_ring_nodes: Option<usize>,
    /// Distribution row selector; 0 is uniform traffic.
    #[serde(default)]
    pub non_uniform: usize,
    #[serde(default)]
    pub distribution_file: Option<PathBuf>,
    #[serde(default)]
    pub routing: RoutingChoice,
    /// Chunks each collective is split into.
    #[serde(default = "default_splits")]
    pub splits: u64,
    #[serde(default)]
    pub boost_mode: bool,
    #[serde(default = "default_link_latency_ns")]
    pub link_latency_ns: u64,
    #[serde(default = "default_link_gbps")]
    pub link_gbps: f64,
    #[serde(default = "default_endpoint_delay_ns")]
    pub endpoint_delay_ns: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dims: Vec::new(),
            collective: default_collective(),
            data_bytes: default_data_bytes(),
            algorithm: AlgorithmVariant::default(),
            injection_policy: InjectionPolicy::default(),
            direction: RingDirection::default(),
            inter_dimension_scheduling: InterDimensionScheduling::default(),
            link_failure_scheduling: LinkFailureScheduling::default(),
            failure_type: FailureType::default(),
            failed_links: Vec::new(),
            link_failure_per_dimension: None,
            failed_ring_nodes: None,
            non_uniform: 0,
            distribution_file: None,
            routing: RoutingChoice::default(),
            splits: default_splits(),
            boost_mode: false,
            link_latency_ns: default_link_latency_ns(),
            link_gbps: default_link_gbps(),
            endpoint_delay_ns: default_endpoint_delay_ns(),
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_list<T>(raw: &str, line: usize, item: impl Fn(&str) -> Result<T, ConfigError>) -> Result<Vec<T>, ConfigError> {
    raw.split(['_', ',', ' '])
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            item(tok).map_err(|err| ConfigError::SystemFile {
                line,
                msg: err.to_string(),
            })
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

impl SimConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path)?)
    }

    pub fn apply_system_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.apply_system_str(&read(path)?)
    }

    /// Applies `key: value` lines. Blank lines and `#` comments are skipped;
    /// keys this simulator has no use for are ignored.
    pub fn apply_system_str(&mut self, raw: &str) -> Result<(), ConfigError> {
        for (idx, line) in raw.lines().enumerate() {
            let lineno = idx + 1;
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(ConfigError::SystemFile {
                    line: lineno,
                    msg: format!("expected `key: value`, got `{line}`"),
                });
            };
            let key = key.trim().replace('_', "-").to_lowercase();
            let value = value.trim();
            self.apply_system_key(&key, value, lineno)?;
        }
        Ok(())
    }

    fn apply_system_key(&mut self, key: &str, value: &str, line: usize) -> Result<(), ConfigError> {
        match key {
            "dims" => self.dims = parse_list(value, line, |tok| parse_number(key, tok))?,
            "collective" => {
                self.collective = CollectiveOp::parse(value)
                    .map_err(|msg| ConfigError::SystemFile { line, msg })?
            }
            "data-bytes" => self.data_bytes = parse_number(key, value)?,
            "link-failure-per-dimension" => {
                self.link_failure_per_dimension =
                    Some(parse_list(value, line, |tok| parse_number(key, tok))?)
            }
            "link-failure-scheduling" => {
                self.link_failure_scheduling = LinkFailureScheduling::parse(value)?
            }
            "failure-type" => self.failure_type = FailureType(parse_number(key, value)?),
            "failed-ring-nodes" => self.failed_ring_nodes = Some(parse_number(key, value)?),
            "non-uniform" => self.non_uniform = parse_number(key, value)?,
            "distribution-file" => self.distribution_file = Some(PathBuf::from(value)),
            "all-to-all-implementation" | "algorithm" => {
                let variants = parse_list(value, line, AlgorithmVariant::parse)?;
                let Some(first) = variants.first().copied() else {
                    return Err(ConfigError::SystemFile {
                        line,
                        msg: format!("{key} is empty"),
                    });
                };
                if variants.iter().any(|v| *v != first) {
                    return Err(ConfigError::SystemFile {
                        line,
                        msg: format!("mixed per-dimension algorithms are not supported: {value}"),
                    });
                }
                self.algorithm = first;
            }
            "endpoint-delay" => self.endpoint_delay_ns = parse_number(key, value)?,
            "link-latency" => self.link_latency_ns = parse_number(key, value)?,
            "link-gbps" => self.link_gbps = parse_number(key, value)?,
            "preferred-dataset-splits" => self.splits = parse_number(key, value)?,
            "inter-dimension-scheduling" => {
                self.inter_dimension_scheduling = InterDimensionScheduling::parse(value)?
            }
            "injection-policy" => self.injection_policy = InjectionPolicy::parse(value)?,
            "boost-mode" => self.boost_mode = parse_flag(key, value)?,
            "routing" => self.routing = RoutingChoice::parse(value)?,
            "direction" => {
                self.direction = match value.to_lowercase().as_str() {
                    "clockwise" => RingDirection::Clockwise,
                    "anticlockwise" => RingDirection::Anticlockwise,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        });
                    }
                }
            }
            _ => debug!(key, line, "ignoring system key"),
        }
        Ok(())
    }

    /// Checks the configuration and builds the shared run state.
    pub fn validate(self) -> Result<SimSetup, ConfigError> {
        let shape = TorusShape::new(self.dims.clone())?;
        if self.splits == 0 {
            return Err(ConfigError::InvalidValue {
                key: "splits".into(),
                value: "0".into(),
            });
        }
        if !(self.link_gbps > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "link_gbps".into(),
                value: self.link_gbps.to_string(),
            });
        }
        if self.algorithm == AlgorithmVariant::HalfRing && self.collective != CollectiveOp::Alltoall {
            return Err(ConfigError::UnsupportedCollective {
                algo: "half_ring",
                op: self.collective.name(),
            });
        }

        let mut registry = FaultRegistry::new(&shape, self.failed_links.clone())?;
        if let Some(counts) = &self.link_failure_per_dimension {
            registry = registry.with_dimension_counts(counts.clone())?;
        }
        if let Some(nodes) = self.failed_ring_nodes {
            registry = registry.with_failed_ring_nodes(nodes);
        }
        for (dim, extent) in shape.extents().iter().enumerate() {
            if *extent == 2 && registry.failures_in_dimension(dim) > 0 {
                return Err(ConfigError::TwoNodeRingFailure { dim });
            }
        }
        let any_failure = (0..shape.dims()).any(|d| registry.failures_in_dimension(d) > 0);
        if self.algorithm == AlgorithmVariant::HalfRing
            && self.link_failure_scheduling.is_mate()
            && any_failure
            && registry.failed_ring_nodes() < 2
        {
            return Err(ConfigError::FailedRingTooSmall(registry.failed_ring_nodes()));
        }

        let distribution = if self.non_uniform > 0 {
            let path = self
                .distribution_file
                .as_deref()
                .ok_or(ConfigError::MissingDistribution)?;
            let table = DistributionTable::load(path)?;
            if table.rows() < self.non_uniform {
                return Err(ConfigError::DistributionRow {
                    row: self.non_uniform - 1,
                });
            }
            Some(Arc::new(table))
        } else {
            None
        };

        let faults = Arc::new(registry);
        let routing = self.routing.resolve(faults.len())?;
        let router = AdaptiveRouter::new(Arc::clone(&faults), routing)?;
        let scheduler = DimensionScheduler::new(
            shape.dims(),
            self.inter_dimension_scheduling,
            self.link_failure_scheduling,
            self.failure_type,
        );

        info!(
            dims = ?shape.extents(),
            nodes = shape.len(),
            collective = %self.collective,
            algorithm = ?self.algorithm,
            failed_links = faults.len(),
            routing = routing.name(),
            policy = ?scheduler.policy(),
            "configuration validated"
        );

        Ok(SimSetup {
            config: self,
            shape,
            faults,
            router,
            scheduler,
            distribution,
        })
    }
}

/// Validated configuration plus the state derived from it.
#[derive(Debug)]
pub struct SimSetup {
    pub config: SimConfig,
    pub shape: TorusShape,
    pub faults: Arc<FaultRegistry>,
    pub router: AdaptiveRouter,
    pub scheduler: DimensionScheduler,
    pub distribution: Option<Arc<DistributionTable>>,
}
