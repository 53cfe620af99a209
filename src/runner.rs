//! Scenario pipeline: configuration → profiles → topology → model → solve →
//! results → KPIs, plus a parallel batch over independent scenarios.

use rayon::prelude::*;
use tracing::{info, info_span, warn};

use crate::config::ScenarioConfig;
use crate::energy::assembler::assemble;
use crate::energy::balance::check_balance;
use crate::energy::kpi::{KpiReport, KpiValue};
use crate::energy::lp::LinearProgram;
use crate::energy::results::ResultSet;
use crate::energy::solver::Solver;
use crate::error::ScenarioError;
use crate::profiles::Profiles;
use crate::scenario::{self, PlanningProblem};

/// Relative tolerance for the post-solve bus balance check.
const BALANCE_TOLERANCE: f64 = 1e-6;

/// Output of one successfully solved scenario.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub name: String,
    pub config: ScenarioConfig,
    pub model: LinearProgram,
    pub results: ResultSet,
    pub kpis: KpiReport,
}

/// Loads the profiles a scenario refers to, or generates synthetic ones.
///
/// # Errors
///
/// Returns a `ScenarioError` if the configured CSV cannot be read or is too
/// short for the horizon.
pub fn load_profiles(config: &ScenarioConfig) -> Result<Profiles, ScenarioError> {
    let index = scenario::time_index(config)?;
    match &config.simulation.timeseries_file {
        Some(path) => {
            info!(path = %path.display(), "reading time series");
            Ok(Profiles::from_csv_path(path, &config.timeseries, index.len())?)
        }
        None => {
            info!(seed = config.simulation.seed, "generating synthetic profiles");
            Ok(Profiles::synthetic(&index, config.simulation.seed))
        }
    }
}

/// Assembles, solves, and evaluates an already built problem.
///
/// # Errors
///
/// Returns `Configuration` if assembly rejects the graph and `Solve` for any
/// non-optimal solver outcome.
pub fn solve_problem(
    problem: &PlanningProblem,
    solver: &dyn Solver,
) -> Result<(LinearProgram, ResultSet, KpiReport), ScenarioError> {
    let (model, index) = assemble(&problem.system, &problem.shared)?;
    info!(model = %model, "model assembled");

    let solution = solver.solve(&model).into_result()?;
    info!(solver = solver.name(), objective = solution.objective, "optimal solution found");

    let results = ResultSet::extract(&problem.system, &index, &solution);
    let violations = check_balance(&results, BALANCE_TOLERANCE);
    if let Some(first) = violations.first() {
        warn!(
            count = violations.len(),
            bus = %first.bus,
            timestep = first.timestep,
            residual = first.residual,
            "bus balance exceeds tolerance"
        );
    }

    let kpis = KpiReport::from_results(&results, &problem.accounting);
    for kpi in &kpis.kpis {
        if let KpiValue::Undefined(reason) = &kpi.value {
            warn!(kpi = %kpi.key, %reason, "kpi undefined");
        }
    }
    Ok((model, results, kpis))
}

/// Runs one scenario end to end.
///
/// # Errors
///
/// Returns `InvalidConfig` with every validation failure, or the first
/// error raised by profile loading, topology building, assembly, or solving.
pub fn run_scenario(config: &ScenarioConfig, solver: &dyn Solver) -> Result<ScenarioRun, ScenarioError> {
    let span = info_span!("scenario", name = %config.scenario.name);
    let _guard = span.enter();

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ScenarioError::InvalidConfig(errors));
    }

    let profiles = load_profiles(config)?;
    let problem = scenario::build(config, &profiles)?;
    info!(system = %problem.system, "topology built");

    let (model, results, kpis) = solve_problem(&problem, solver)?;
    Ok(ScenarioRun {
        name: problem.name,
        config: config.clone(),
        model,
        results,
        kpis,
    })
}

/// Runs independent scenarios in parallel.
///
/// A failing scenario never affects the others; results come back in input
/// order, paired with the scenario name.
pub fn run_batch(
    configs: &[ScenarioConfig],
    solver: &dyn Solver,
) -> Vec<(String, Result<ScenarioRun, ScenarioError>)> {
    configs
        .par_iter()
        .map(|config| {
            let outcome = run_scenario(config, solver);
            if let Err(err) = &outcome {
                warn!(scenario = %config.scenario.name, error = %err, "scenario failed");
            }
            (config.scenario.name.clone(), outcome)
        })
        .collect()
}
