use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use torus_ccsim::cc::{AlgorithmVariant, CollectiveOp, InjectionPolicy, InterDimensionScheduling};
use torus_ccsim::config::{RoutingChoice, SimConfig};
use torus_ccsim::error::{ConfigError, SimError};
use torus_ccsim::fault::{FailedLink, FailureType, LinkFailureScheduling};
use torus_ccsim::net::CollectiveWorld;
use torus_ccsim::sim::{SimTime, Simulator};

#[derive(Debug, Parser)]
#[command(
    name = "torus-sim",
    about = "Simulate a collective on a ring / N-D torus with optional link failures"
)]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// `key: value` system file applied on top of the JSON configuration
    #[arg(long)]
    system: Option<PathBuf>,

    /// Torus extents, e.g. `4,4`
    #[arg(long, value_delimiter = ',')]
    dims: Option<Vec<usize>>,

    /// all_reduce, all_gather, reduce_scatter or all_to_all
    #[arg(long)]
    collective: Option<String>,

    #[arg(long)]
    data_bytes: Option<u64>,

    /// ring or half_ring
    #[arg(long)]
    algorithm: Option<String>,

    /// normal or aggressive
    #[arg(long)]
    injection_policy: Option<String>,

    #[arg(long)]
    inter_dimension_scheduling: Option<String>,

    /// baseline, mate or mate_enhanced
    #[arg(long)]
    link_failure_scheduling: Option<String>,

    #[arg(long)]
    failure_type: Option<u32>,

    /// Failed link `a-b`; repeat for more
    #[arg(long = "failed-link")]
    failed_links: Vec<FailedLink>,

    /// auto, dormin, sandwich or sandwiches
    #[arg(long)]
    routing: Option<String>,

    /// Chunks the collective is split into
    #[arg(long)]
    splits: Option<u64>,

    #[arg(long)]
    boost_mode: bool,

    #[arg(long)]
    link_latency_ns: Option<u64>,

    #[arg(long)]
    link_gbps: Option<f64>,

    #[arg(long)]
    endpoint_delay_ns: Option<u64>,

    /// Output viz JSON file
    #[arg(long)]
    viz_json: Option<PathBuf>,

    /// Run until this time (us); defaults to running until completion
    #[arg(long)]
    until_us: Option<u64>,

    /// Turn logging off
    #[arg(long)]
    quiet: bool,
}

fn invalid(key: &str, err: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: err.to_string(),
    }
}

fn load_config(args: &Args) -> Result<SimConfig, ConfigError> {
    let mut cfg = match &args.config {
        Some(path) => SimConfig::load_json(path)?,
        None => SimConfig::default(),
    };
    if let Some(path) = &args.system {
        cfg.apply_system_file(path)?;
    }

    if let Some(dims) = &args.dims {
        cfg.dims = dims.clone();
    }
    if let Some(raw) = &args.collective {
        cfg.collective = CollectiveOp::parse(raw).map_err(|e| invalid("collective", e))?;
    }
    if let Some(bytes) = args.data_bytes {
        cfg.data_bytes = bytes;
    }
    if let Some(raw) = &args.algorithm {
        cfg.algorithm = AlgorithmVariant::parse(raw)?;
    }
    if let Some(raw) = &args.injection_policy {
        cfg.injection_policy = InjectionPolicy::parse(raw)?;
    }
    if let Some(raw) = &args.inter_dimension_scheduling {
        cfg.inter_dimension_scheduling = InterDimensionScheduling::parse(raw)?;
    }
    if let Some(raw) = &args.link_failure_scheduling {
        cfg.link_failure_scheduling = LinkFailureScheduling::parse(raw)?;
    }
    if let Some(t) = args.failure_type {
        cfg.failure_type = FailureType(t);
    }
    if !args.failed_links.is_empty() {
        cfg.failed_links = args.failed_links.clone();
    }
    if let Some(raw) = &args.routing {
        cfg.routing = RoutingChoice::parse(raw)?;
    }
    if let Some(splits) = args.splits {
        cfg.splits = splits;
    }
    if args.boost_mode {
        cfg.boost_mode = true;
    }
    if let Some(ns) = args.link_latency_ns {
        cfg.link_latency_ns = ns;
    }
    if let Some(gbps) = args.link_gbps {
        cfg.link_gbps = gbps;
    }
    if let Some(ns) = args.endpoint_delay_ns {
        cfg.endpoint_delay_ns = ns;
    }
    Ok(cfg)
}

fn run(args: Args) -> Result<ExitCode, SimError> {
    let setup = load_config(&args)?.validate()?;

    let mut sim = Simulator::default();
    let mut world = CollectiveWorld::new(setup);
    if args.viz_json.is_some() {
        world.enable_viz();
    }
    world.launch(&mut sim)?;

    if let Some(until_us) = args.until_us {
        sim.run_until(SimTime::from_micros(until_us), &mut world);
    } else {
        sim.run(&mut world);
    }

    let summary = world.summary(&sim);
    println!(
        "summary {}",
        serde_json::to_string(&summary).map_err(ConfigError::from)?
    );
    for record in &world.stats.finished {
        println!(
            "stream node={} id={} phases={} finish_ns={} data_bytes={}",
            record.node.0, record.stream.0, record.phases, record.finished_at.0, record.data_bytes
        );
    }

    if let Some(path) = &args.viz_json {
        if let Some(v) = world.viz.take() {
            let json = v.to_json().map_err(ConfigError::from)?;
            fs::write(path, json).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            eprintln!("wrote viz events to {}", path.display());
        }
    }

    if let Some(err) = world.take_error() {
        return Err(err);
    }
    if args.until_us.is_none() && summary.unfinished > 0 {
        eprintln!(
            "error: {} of {} streams did not finish ({} receives still posted)",
            summary.unfinished, summary.streams, summary.pending_recvs
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_filter = if args.quiet { "off" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
