//! Solver adapters.
//!
//! The core only depends on the [`Solver`] trait; the default build ships a
//! Clarabel backend through `good_lp`.

use std::time::Instant;

use tracing::{debug, warn};

use super::lp::LinearProgram;
use crate::error::SolveFailure;

/// Primal values of an optimal solve, indexed like the program's variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub values: Vec<f64>,
    pub objective: f64,
}

/// Terminal status of one solve attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal(Solution),
    Infeasible,
    Unbounded,
    SolverError(String),
}

impl SolveOutcome {
    pub fn is_optimal(&self) -> bool {
        matches!(self, Self::Optimal(_))
    }

    /// Converts non-optimal outcomes into a `SolveFailure`.
    ///
    /// # Errors
    ///
    /// Every variant other than `Optimal` maps to its failure counterpart;
    /// no values are carried over from a failed solve.
    pub fn into_result(self) -> Result<Solution, SolveFailure> {
        match self {
            Self::Optimal(solution) => Ok(solution),
            Self::Infeasible => Err(SolveFailure::Infeasible),
            Self::Unbounded => Err(SolveFailure::Unbounded),
            Self::SolverError(message) => Err(SolveFailure::Solver(message)),
        }
    }
}

/// A backend able to minimise a [`LinearProgram`].
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, lp: &LinearProgram) -> SolveOutcome;
}

/// Interior-point backend (Clarabel) driven through `good_lp`.
#[cfg(feature = "solver-clarabel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelSolver;

#[cfg(feature = "solver-clarabel")]
impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, lp: &LinearProgram) -> SolveOutcome {
        use good_lp::solvers::clarabel::clarabel;
        use good_lp::{
            Expression, ProblemVariables, ResolutionError, Solution as _, SolverModel, constraint,
            variable,
        };

        use super::lp::{LinearExpr, Relation};

        let start = Instant::now();
        let mut vars = ProblemVariables::new();
        let handles: Vec<good_lp::Variable> = lp
            .variables()
            .iter()
            .map(|v| {
                let mut def = variable().min(v.lower);
                if v.upper.is_finite() {
                    def = def.max(v.upper);
                }
                vars.add(def)
            })
            .collect();

        let to_expression = |expr: &LinearExpr| {
            let mut out = Expression::from(expr.constant);
            for (var, coefficient) in &expr.terms {
                out += *coefficient * handles[var.index()];
            }
            out
        };

        let mut problem = vars.minimise(to_expression(lp.objective())).using(clarabel);
        for c in lp.constraints() {
            let lhs = to_expression(&c.expr);
            problem = match c.relation {
                Relation::Eq => problem.with(constraint!(lhs == c.rhs)),
                Relation::Le => problem.with(constraint!(lhs <= c.rhs)),
                Relation::Ge => problem.with(constraint!(lhs >= c.rhs)),
            };
        }

        let outcome = match problem.solve() {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|h| solution.value(*h)).collect();
                let objective = lp.objective().evaluate(&values);
                SolveOutcome::Optimal(Solution { values, objective })
            }
            Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
            Err(ResolutionError::Unbounded) => SolveOutcome::Unbounded,
            Err(other) => {
                warn!(error = %other, "solver reported an error");
                SolveOutcome::SolverError(other.to_string())
            }
        };
        debug!(
            solver = self.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            optimal = outcome.is_optimal(),
            "solve finished"
        );
        outcome
    }
}

/// The solver used when none is chosen explicitly.
#[cfg(feature = "solver-clarabel")]
pub fn default_solver() -> Box<dyn Solver> {
    Box::new(ClarabelSolver)
}
