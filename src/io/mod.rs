//! Output files written for solved scenarios.

pub mod export;
pub mod lp_file;
