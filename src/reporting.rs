//! Console output for solved scenarios.

use std::fmt::Write as _;

use crate::error::ScenarioError;
use crate::runner::ScenarioRun;

/// Renders the report of one solved scenario: objective, installed sizes,
/// and the KPI table.
pub fn scenario_report(run: &ScenarioRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Scenario: {} ===", run.name);
    let _ = writeln!(out, "Objective: {:.2} EUR/a", run.results.objective());
    let installed: Vec<_> = run.results.investments().iter().filter(|i| i.size > 1e-6).collect();
    if installed.is_empty() {
        let _ = writeln!(out, "No investments");
    } else {
        let _ = writeln!(out, "Investments:");
        for sized in installed {
            let _ = writeln!(out, "  {:<20} {:>14.2}", sized.label, sized.size);
        }
    }
    let _ = write!(out, "\n{}", run.kpis);
    out
}

/// One line per scenario: `ok` with its objective or `FAILED` with the error.
pub fn batch_summary(outcomes: &[(String, Result<ScenarioRun, ScenarioError>)]) -> String {
    let mut out = String::from("--- Batch Summary ---\n");
    for (name, outcome) in outcomes {
        let _ = match outcome {
            Ok(run) => writeln!(out, "  {name:<24} ok      objective {:.2}", run.results.objective()),
            Err(err) => writeln!(out, "  {name:<24} FAILED  {err}"),
        };
    }
    out
}

pub fn print_scenario_report(run: &ScenarioRun) {
    println!("{}", scenario_report(run));
}

pub fn print_batch_summary(outcomes: &[(String, Result<ScenarioRun, ScenarioError>)]) {
    println!("{}", batch_summary(outcomes));
}
