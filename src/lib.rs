//! Multi-carrier district energy planning: sizing and dispatch as one linear
//! program over a gas, electricity, and heat network.

pub mod cli;
pub mod config;
/// Topology, model assembly, solving, results, and KPIs.
pub mod energy;
pub mod error;
pub mod io;
pub mod profiles;
pub mod reporting;
pub mod runner;
pub mod scenario;
pub mod telemetry;
