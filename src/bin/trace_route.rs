//! 路由追踪模式
//!
//! 对一对节点逐跳调用自适应路由器，打印每一跳的输出端口与 dateline 状态。

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use torus_ccsim::config::{RoutingChoice, SimConfig};
use torus_ccsim::error::SimError;
use torus_ccsim::fault::FailedLink;
use torus_ccsim::route::RouteStep;
use torus_ccsim::topo::NodeId;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "trace-route", about = "逐跳打印自适应路由器在 torus 上的选路结果")]
struct Args {
    /// Torus extents, e.g. `4,4`
    #[arg(long, value_delimiter = ',', required = true)]
    dims: Vec<usize>,

    /// Failed link `a-b`; repeat for more
    #[arg(long = "failed-link")]
    failed_links: Vec<FailedLink>,

    /// auto, dormin, sandwich or sandwiches
    #[arg(long, default_value = "auto")]
    routing: String,

    #[arg(long)]
    src: usize,

    #[arg(long)]
    dst: usize,

    #[arg(long, default_value_t = 0)]
    vnet: usize,

    /// Print the route as one JSON object
    #[arg(long)]
    json: bool,

    /// Turn logging off
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct TracedRoute {
    src: NodeId,
    dst: NodeId,
    routing: &'static str,
    hops: Vec<TracedHop>,
}

#[derive(Debug, Serialize)]
struct TracedHop {
    at: NodeId,
    #[serde(flatten)]
    step: RouteStep,
    crossed_dateline: bool,
}

fn run(args: &Args) -> Result<TracedRoute, SimError> {
    let cfg = SimConfig {
        dims: args.dims.clone(),
        failed_links: args.failed_links.clone(),
        routing: RoutingChoice::parse(&args.routing)?,
        ..SimConfig::default()
    };
    let mut setup = cfg.validate()?;
    let (src, dst) = (NodeId(args.src), NodeId(args.dst));
    info!(?src, ?dst, routing = setup.router.algorithm().name(), "🔍 追踪路由");

    let hops = setup
        .router
        .trace(src, dst, args.vnet)?
        .into_iter()
        .map(|(at, step)| {
            debug!(at = at.0, next = step.next.0, direction = %step.port.direction, "hop");
            TracedHop {
                at,
                step,
                crossed_dateline: step.port.channel == 1,
            }
        })
        .collect();
    Ok(TracedRoute {
        src,
        dst,
        routing: setup.router.algorithm().name(),
        hops,
    })
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
        .with_target(false)
        .init();

    let route = match run(&args) {
        Ok(route) => route,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string(&route) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for hop in &route.hops {
            println!(
                "hop at={} next={} direction={} channel={} dateline={}",
                hop.at.0,
                hop.step.next.0,
                hop.step.port.direction,
                hop.step.port.channel,
                hop.crossed_dateline
            );
        }
        println!(
            "route src={} dst={} hops={} routing={}",
            route.src.0,
            route.dst.0,
            route.hops.len(),
            route.routing
        );
    }
    ExitCode::SUCCESS
}
