//! Energy system core: topology, model assembly, solving, and evaluation.

pub mod assembler;
pub mod balance;
pub mod investment;
pub mod kpi;
pub mod lp;
pub mod results;
pub mod solver;
pub mod time_index;
pub mod topology;
pub mod windows;
