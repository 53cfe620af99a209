//! Seasonal sub-series sliced from full-horizon flow sequences.
//!
//! Windows are fixed, non-overlapping index ranges; slicing never triggers a
//! new optimization.

use std::ops::Range;

use serde::Serialize;

use super::results::{FlowSeries, ResultSet};
use super::topology::{BusId, Direction};

/// Flows whose total over a window does not exceed this are left out of a
/// bus series.
pub const MIN_WINDOW_TOTAL: f64 = 0.1;

/// A named index range over the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub name: &'static str,
    pub range: Range<usize>,
}

/// One representative week per season in an hourly reference year.
pub const SEASONS: [Window; 4] = [
    Window {
        name: "winter",
        range: 144..312,
    },
    Window {
        name: "spring",
        range: 2328..2496,
    },
    Window {
        name: "summer",
        range: 5184..5352,
    },
    Window {
        name: "autumn",
        range: 6863..7031,
    },
];

impl Window {
    /// The part of the window inside a horizon of `len` steps, if any.
    pub fn clip(&self, len: usize) -> Option<Range<usize>> {
        let end = self.range.end.min(len);
        (self.range.start < end).then_some(self.range.start..end)
    }
}

/// Signed per-flow columns of one bus over a step range.
///
/// Supply into the bus is positive, consumption negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusSeries {
    pub bus: String,
    pub range: Range<usize>,
    /// `(column name, signed values)`, largest absolute total first.
    ///
    /// A column is named after its component. A component with flows in
    /// both directions on the bus, such as a storage, gets `<label>_in`
    /// for the flow leaving the bus and `<label>_out` for the flow entering.
    pub columns: Vec<(String, Vec<f64>)>,
}

impl BusSeries {
    /// Builds the series for `bus` over `range`.
    ///
    /// Flows with a window total of at most [`MIN_WINDOW_TOTAL`] are dropped.
    /// The remaining columns are sorted by absolute total, descending; ties
    /// keep topology order.
    pub fn for_bus(results: &ResultSet, bus: BusId, range: Range<usize>) -> Self {
        let mut columns: Vec<(String, Vec<f64>)> = results
            .flows_at(bus)
            .filter_map(|flow| {
                let slice = flow.values.get(range.clone())?;
                if slice.iter().sum::<f64>() <= MIN_WINDOW_TOTAL {
                    return None;
                }
                let sign = match flow.direction {
                    Direction::IntoBus => 1.0,
                    Direction::OutOfBus => -1.0,
                };
                Some((column_name(results, flow), slice.iter().map(|v| sign * v).collect()))
            })
            .collect();

        columns.sort_by(|(_, a), (_, b)| {
            let total = |v: &Vec<f64>| v.iter().sum::<f64>().abs();
            total(b).total_cmp(&total(a))
        });

        Self {
            bus: results.bus_label(bus).to_string(),
            range,
            columns,
        }
    }

    /// Full-horizon series for `bus`.
    pub fn full(results: &ResultSet, bus: BusId) -> Self {
        Self::for_bus(results, bus, results.time_index().steps())
    }

    /// Series for `bus` over a seasonal window, or `None` if the window lies
    /// outside the horizon.
    pub fn seasonal(results: &ResultSet, bus: BusId, window: &Window) -> Option<Self> {
        let range = window.clip(results.time_index().len())?;
        Some(Self::for_bus(results, bus, range))
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

fn column_name(results: &ResultSet, flow: &FlowSeries) -> String {
    let shared = results
        .flows_at(flow.bus_id)
        .filter(|f| f.component_id == flow.component_id)
        .count()
        > 1;
    if !shared {
        return flow.component.clone();
    }
    match flow.direction {
        Direction::OutOfBus => format!("{}_in", flow.component),
        Direction::IntoBus => format!("{}_out", flow.component),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::assembler::assemble;
    use crate::energy::solver::Solution;
    use crate::energy::time_index::TimeIndex;
    use crate::energy::investment::Investment;
    use crate::energy::topology::{Component, EnergySystem, Flow, Storage};

    fn results() -> ResultSet {
        let mut es = EnergySystem::new(TimeIndex::hourly_from_2019(4));
        let el = es.add_bus("electricity").unwrap();
        es.add_component(Component::source("pv", Flow::new(el))).unwrap();
        es.add_component(Component::source("grid", Flow::new(el))).unwrap();
        es.add_component(Component::sink("demand", Flow::new(el))).unwrap();
        es.add_component(Component::sink("excess", Flow::new(el))).unwrap();
        let (_, index) = assemble(&es, &[]).unwrap();
        let values = vec![
            0.0, 0.0, 3.0, 3.0, // pv
            1.0, 1.0, 0.0, 0.0, // grid
            1.0, 1.0, 1.0, 1.0, // demand
            0.0, 0.0, 2.0, 2.0, // excess
        ];
        ResultSet::extract(&es, &index, &Solution { values, objective: 0.0 })
    }

    #[test]
    fn windows_do_not_overlap() {
        for pair in SEASONS.windows(2) {
            assert!(pair[0].range.end <= pair[1].range.start);
        }
        assert!(SEASONS.iter().all(|w| w.range.len() == 168));
    }

    #[test]
    fn clip_to_short_horizon() {
        assert_eq!(SEASONS[0].clip(200), Some(144..200));
        assert_eq!(SEASONS[0].clip(100), None);
        assert_eq!(SEASONS[3].clip(8760), Some(6863..7031));
    }

    #[test]
    fn columns_are_signed_and_sorted() {
        let results = results();
        let series = BusSeries::full(&results, results.bus_id("electricity").unwrap());
        let names: Vec<&str> = series.columns.iter().map(|(n, _)| n.as_str()).collect();
        // |pv| = 6, |demand| = 4, |excess| = 4, |grid| = 2
        assert_eq!(names, vec!["pv", "demand", "excess", "grid"]);
        assert_eq!(series.columns[1].1, vec![-1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn idle_flows_are_dropped_per_window() {
        let results = results();
        let series = BusSeries::for_bus(&results, results.bus_id("electricity").unwrap(), 0..2);
        let names: Vec<&str> = series.columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["grid", "demand"]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn storage_columns_are_named_by_direction() {
        let mut es = EnergySystem::new(TimeIndex::hourly_from_2019(4));
        let el = es.add_bus("electricity").unwrap();
        es.add_component(Component::source("grid", Flow::new(el))).unwrap();
        es.add_component(Component::storage(
            "battery",
            Flow::new(el),
            Flow::new(el),
            Storage {
                investment: Some(Investment::new(1.0)),
                ..Storage::default()
            },
        ))
        .unwrap();
        es.add_component(Component::sink("demand", Flow::new(el))).unwrap();
        let (lp, index) = assemble(&es, &[]).unwrap();
        let mut values = vec![0.0; lp.variables().len()];
        // grid, battery in, battery out, demand; each 4 steps
        let flows = [
            [3.0, 3.0, 1.0, 1.0],
            [2.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 1.0],
            [1.0, 1.0, 2.0, 2.0],
        ];
        for (vars, series) in index.flow_vars.iter().zip(flows) {
            for (var, v) in vars.iter().zip(series) {
                values[var.index()] = v;
            }
        }
        let results = ResultSet::extract(&es, &index, &Solution { values, objective: 0.0 });

        let series = BusSeries::full(&results, results.bus_id("electricity").unwrap());
        let mut names: Vec<&str> = series.columns.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["battery_in", "battery_out", "demand", "grid"]);
        let charge = series.columns.iter().find(|(n, _)| n == "battery_in").unwrap();
        assert_eq!(charge.1, vec![-2.0, -2.0, 0.0, 0.0]);
    }
}
