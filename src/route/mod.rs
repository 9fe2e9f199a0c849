//! Fault-tolerant adaptive routing on a (up to) 3-D torus.
//!
//! Fault free: DORMIN. One failed link: sandwich detour. Two failed links:
//! sandwich applied to whichever failure the path meets first.

mod direction;
mod dormin;
mod route_info;
mod router;
mod sandwich;

pub use direction::{Direction, Port};
pub use dormin::{Move, RoutePlan, baseline_path, intermediate_node, leg_direction};
pub use route_info::RouteInfo;
pub use router::{AdaptiveRouter, RouteStep, RoutingAlgorithm};
pub use sandwich::Sandwich;
