pub mod cc;
pub mod config;
pub mod error;
pub mod fault;
pub mod net;
pub mod route;
pub mod sim;
pub mod topo;
pub mod viz;

#[cfg(test)]
mod test;
