//! Bus balance residuals and energy totals computed from solved flows.

use super::results::ResultSet;
use super::topology::{BusId, Direction};

/// Net injection into a bus at step `t`: inflows positive, outflows negative.
///
/// For a feasible solve this is zero up to solver tolerance at every step.
pub fn bus_residual(results: &ResultSet, bus: BusId, t: usize) -> f64 {
    results
        .flows_at(bus)
        .map(|f| {
            let v = f.values.get(t).copied().unwrap_or(0.0);
            match f.direction {
                Direction::IntoBus => v,
                Direction::OutOfBus => -v,
            }
        })
        .sum()
}

/// A bus and step where inflows and outflows disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceViolation {
    pub bus: String,
    pub timestep: usize,
    pub residual: f64,
}

/// Finds every `(bus, t)` whose residual exceeds `tolerance` relative to the
/// larger of 1 and the bus throughput at that step.
pub fn check_balance(results: &ResultSet, tolerance: f64) -> Vec<BalanceViolation> {
    let mut violations = Vec::new();
    for (bus, label) in results.buses() {
        for t in results.time_index().steps() {
            let throughput: f64 = results
                .flows_at(bus)
                .filter(|f| f.direction == Direction::IntoBus)
                .map(|f| f.values.get(t).copied().unwrap_or(0.0).abs())
                .sum();
            let residual = bus_residual(results, bus, t);
            if residual.abs() > tolerance * throughput.max(1.0) {
                violations.push(BalanceViolation {
                    bus: label.to_string(),
                    timestep: t,
                    residual,
                });
            }
        }
    }
    violations
}

/// Total energy entering and leaving a bus over the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BusTotals {
    pub supplied: f64,
    pub consumed: f64,
}

pub fn bus_totals(results: &ResultSet, bus: BusId) -> BusTotals {
    results
        .flows_at(bus)
        .fold(BusTotals::default(), |mut acc, f| {
            match f.direction {
                Direction::IntoBus => acc.supplied += f.total(),
                Direction::OutOfBus => acc.consumed += f.total(),
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::assembler::assemble;
    use crate::energy::solver::Solution;
    use crate::energy::time_index::TimeIndex;
    use crate::energy::topology::{Component, EnergySystem, Flow};

    fn results_with(grid: Vec<f64>, demand: Vec<f64>) -> ResultSet {
        let mut es = EnergySystem::new(TimeIndex::hourly_from_2019(grid.len()));
        let el = es.add_bus("electricity").unwrap();
        es.add_component(Component::source("grid", Flow::new(el))).unwrap();
        es.add_component(Component::sink("demand", Flow::new(el))).unwrap();
        let (_, index) = assemble(&es, &[]).unwrap();
        let values: Vec<f64> = grid.into_iter().chain(demand).collect();
        ResultSet::extract(&es, &index, &Solution { values, objective: 0.0 })
    }

    #[test]
    fn balanced_flows_have_no_residual() {
        let results = results_with(vec![1.0, 2.0], vec![1.0, 2.0]);
        let el = results.bus_id("electricity").unwrap();
        assert_eq!(bus_residual(&results, el, 1), 0.0);
        assert!(check_balance(&results, 1e-6).is_empty());
    }

    #[test]
    fn surplus_is_reported_with_bus_and_step() {
        let results = results_with(vec![1.0, 3.0], vec![1.0, 2.0]);
        let violations = check_balance(&results, 1e-6);
        assert_eq!(
            violations,
            vec![BalanceViolation {
                bus: "electricity".into(),
                timestep: 1,
                residual: 1.0,
            }]
        );
    }

    #[test]
    fn totals_split_by_direction() {
        let results = results_with(vec![1.0, 2.0], vec![1.0, 2.0]);
        let totals = bus_totals(&results, results.bus_id("electricity").unwrap());
        assert_eq!(totals.supplied, 3.0);
        assert_eq!(totals.consumed, 3.0);
    }
}
