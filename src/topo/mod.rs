//! Ring / N-dimensional torus topology model.
//!
//! Node ids are mixed-radix encodings of per-dimension coordinates:
//! dimension 0 varies fastest.

mod id;
mod ring;
mod torus;

pub use id::{NodeId, Sign};
pub use ring::{DimensionKind, RingDirection, RingTopology};
pub use torus::TorusShape;
