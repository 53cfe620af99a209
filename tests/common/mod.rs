//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use district_planner::config::ScenarioConfig;
use district_planner::energy::assembler::{SharedResource, assemble};
use district_planner::energy::kpi::KpiReport;
use district_planner::energy::lp::LinearProgram;
use district_planner::energy::results::ResultSet;
use district_planner::energy::solver::{ClarabelSolver, Solver};
use district_planner::energy::topology::EnergySystem;
use district_planner::runner::{load_profiles, solve_problem};
use district_planner::scenario::{self, PlanningProblem};

/// Absolute tolerance for values coming out of the interior-point solver.
pub const TOL: f64 = 1e-4;

/// Asserts `actual` is within `tol` of `expected`, scaled by magnitude.
pub fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tol * scale,
        "{what}: expected {expected}, got {actual}"
    );
}

/// Solved investment size of `label`; zero for an omitted technology.
pub fn size(results: &ResultSet, label: &str) -> f64 {
    results
        .investment(label)
        .unwrap_or_else(|| panic!("`{label}` is neither invested in nor omitted"))
}

/// Sum over the horizon of the flow `from -> to`.
pub fn flow_total(results: &ResultSet, from: &str, to: &str) -> f64 {
    results
        .flow(from, to)
        .map(|f| f.total())
        .unwrap_or_else(|| panic!("no flow from `{from}` to `{to}`"))
}

/// Assembles and solves a hand-built system.
pub fn solve_system(system: &EnergySystem, shared: &[SharedResource]) -> (LinearProgram, ResultSet) {
    let (lp, index) = assemble(system, shared).expect("system should assemble");
    let solution = ClarabelSolver
        .solve(&lp)
        .into_result()
        .expect("solver should find an optimum");
    let results = ResultSet::extract(system, &index, &solution);
    (lp, results)
}

/// A preset shortened to `horizon` hourly steps with synthetic profiles.
pub fn short_preset(name: &str, horizon: usize) -> ScenarioConfig {
    let mut config = ScenarioConfig::from_preset(name).expect("preset should exist");
    config.simulation.horizon = horizon;
    config.simulation.timeseries_file = None;
    config.simulation.write_lp = false;
    config
}

/// Builds the reference district for `config`.
pub fn build_problem(config: &ScenarioConfig) -> PlanningProblem {
    let profiles = load_profiles(config).expect("profiles should load");
    scenario::build(config, &profiles).expect("topology should build")
}

/// Builds and solves the reference district for `config`.
pub fn solve_config(config: &ScenarioConfig) -> (PlanningProblem, LinearProgram, ResultSet, KpiReport) {
    let problem = build_problem(config);
    let (lp, results, kpis) = solve_problem(&problem, &ClarabelSolver).expect("scenario should solve");
    (problem, lp, results, kpis)
}
