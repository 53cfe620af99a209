//! Results extraction: solved values re-indexed onto the flows, components,
//! and buses of the solved system.
//!
//! Series are stored in handle order, so lookups by [`FlowId`],
//! [`ComponentId`], or [`BusId`] are direct. Label lookups exist for
//! reporting only.

use serde::Serialize;

use super::assembler::ModelIndex;
use super::solver::Solution;
use super::time_index::TimeIndex;
use super::topology::{BusId, ComponentId, Direction, EnergySystem, FlowId, NodeKind};

/// Solved sequence of one flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSeries {
    pub from: String,
    pub to: String,
    /// Label of the bus end of the flow.
    pub bus: String,
    /// Label of the component end of the flow.
    pub component: String,
    #[serde(skip)]
    pub bus_id: BusId,
    #[serde(skip)]
    pub component_id: ComponentId,
    pub direction: Direction,
    pub values: Vec<f64>,
}

impl FlowSeries {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Solved size of one investment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizedComponent {
    pub label: String,
    #[serde(skip)]
    pub component: ComponentId,
    pub size: f64,
}

/// Solved level sequence and capacity of one storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageSeries {
    pub label: String,
    #[serde(skip)]
    pub component: ComponentId,
    pub capacity: f64,
    pub invested: bool,
    pub levels: Vec<f64>,
}

/// Immutable outcome of one successful solve.
///
/// Every KPI is a pure function of this value; it is never mutated after
/// [`ResultSet::extract`] returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    time_index: TimeIndex,
    objective: f64,
    buses: Vec<String>,
    #[serde(skip)]
    bus_ids: Vec<BusId>,
    #[serde(skip)]
    components: Vec<String>,
    /// Indexed by [`FlowId`].
    flows: Vec<FlowSeries>,
    investments: Vec<SizedComponent>,
    storages: Vec<StorageSeries>,
    /// Technologies the builder left out; their sizes read as zero.
    omitted: Vec<String>,
}

impl ResultSet {
    /// Re-indexes the solution onto the topology of `system`.
    pub fn extract(system: &EnergySystem, index: &ModelIndex, solution: &Solution) -> Self {
        let value = |var: super::lp::VarId| solution.values.get(var.index()).copied().unwrap_or(0.0);

        let flows = system
            .flows()
            .map(|(id, edge)| {
                let (from, to) = system.flow_labels(id);
                FlowSeries {
                    from,
                    to,
                    bus: system.bus(edge.bus()).label.clone(),
                    component: system.component(edge.component).label.clone(),
                    bus_id: edge.bus(),
                    component_id: edge.component,
                    direction: edge.direction,
                    values: index.flow_vars[id.index()].iter().map(|v| value(*v)).collect(),
                }
            })
            .collect();

        let mut investments = Vec::new();
        let mut storages = Vec::new();
        for (id, node) in system.components() {
            if let Some(var) = index.component_investment(system, id) {
                investments.push(SizedComponent {
                    label: node.label.clone(),
                    component: id,
                    size: value(var),
                });
            }
            if let NodeKind::Storage { storage, .. } = &node.kind {
                let invested = index.storage_investments[id.index()];
                let capacity = match invested {
                    Some(var) => value(var),
                    None => storage.nominal_capacity.unwrap_or(0.0),
                };
                let levels = index.storage_levels[id.index()]
                    .as_ref()
                    .map(|vars| vars.iter().map(|v| value(*v)).collect())
                    .unwrap_or_default();
                storages.push(StorageSeries {
                    label: node.label.clone(),
                    component: id,
                    capacity,
                    invested: invested.is_some(),
                    levels,
                });
            }
        }

        Self {
            time_index: system.time_index().clone(),
            objective: solution.objective,
            buses: system.buses().map(|(_, b)| b.label.clone()).collect(),
            bus_ids: system.buses().map(|(id, _)| id).collect(),
            components: system.components().map(|(_, c)| c.label.clone()).collect(),
            flows,
            investments,
            storages,
            omitted: system.omitted().map(str::to_string).collect(),
        }
    }

    pub fn time_index(&self) -> &TimeIndex {
        &self.time_index
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Buses with their labels, in handle order.
    pub fn buses(&self) -> impl Iterator<Item = (BusId, &str)> {
        self.bus_ids
            .iter()
            .copied()
            .zip(self.buses.iter().map(String::as_str))
    }

    pub fn bus_id(&self, label: &str) -> Option<BusId> {
        self.buses().find_map(|(id, l)| (l == label).then_some(id))
    }

    pub fn bus_label(&self, id: BusId) -> &str {
        &self.buses[id.index()]
    }

    pub fn component_label(&self, id: ComponentId) -> &str {
        &self.components[id.index()]
    }

    pub fn flows(&self) -> &[FlowSeries] {
        &self.flows
    }

    pub fn storages(&self) -> &[StorageSeries] {
        &self.storages
    }

    pub fn investments(&self) -> &[SizedComponent] {
        &self.investments
    }

    pub fn flow_series(&self, id: FlowId) -> &FlowSeries {
        &self.flows[id.index()]
    }

    /// Sum of one flow over the horizon.
    pub fn flow_sum(&self, id: FlowId) -> f64 {
        self.flow_series(id).total()
    }

    /// Flows attached to `bus`.
    pub fn flows_at(&self, bus: BusId) -> impl Iterator<Item = &FlowSeries> {
        self.flows.iter().filter(move |f| f.bus_id == bus)
    }

    /// Solved investment size; `None` for a component without investment.
    pub fn size(&self, component: ComponentId) -> Option<f64> {
        self.investments
            .iter()
            .find(|i| i.component == component)
            .map(|i| i.size)
    }

    pub fn storage_of(&self, component: ComponentId) -> Option<&StorageSeries> {
        self.storages.iter().find(|s| s.component == component)
    }

    /// Sum over the horizon of all flows into `component` from any bus.
    pub fn component_input_total(&self, component: ComponentId) -> f64 {
        self.component_total(component, Direction::OutOfBus)
    }

    /// Sum over the horizon of all flows from `component` into any bus.
    pub fn component_output_total(&self, component: ComponentId) -> f64 {
        self.component_total(component, Direction::IntoBus)
    }

    fn component_total(&self, component: ComponentId, direction: Direction) -> f64 {
        self.flows
            .iter()
            .filter(|f| f.component_id == component && f.direction == direction)
            .map(FlowSeries::total)
            .sum()
    }

    /// Flow keyed by `(source label, target label)`.
    pub fn flow(&self, from: &str, to: &str) -> Option<&FlowSeries> {
        self.flows.iter().find(|f| f.from == from && f.to == to)
    }

    /// Solved size of an investment by label.
    ///
    /// `Some(0.0)` for a technology the builder omitted; `None` for a label
    /// that is neither invested in nor omitted.
    pub fn investment(&self, label: &str) -> Option<f64> {
        if self.omitted.iter().any(|l| l == label) {
            return Some(0.0);
        }
        self.investments
            .iter()
            .find(|i| i.label == label)
            .map(|i| i.size)
    }

    pub fn storage(&self, label: &str) -> Option<&StorageSeries> {
        self.storages.iter().find(|s| s.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::assembler::assemble;
    use crate::energy::investment::Investment;
    use crate::energy::topology::{Component, Flow};

    fn solved_by_hand() -> ResultSet {
        let mut es = EnergySystem::new(TimeIndex::hourly_from_2019(2));
        let el = es.add_bus("electricity").unwrap();
        es.omit("solar_thermal").unwrap();
        es.add_component(Component::source(
            "pv",
            Flow::new(el).fixed(vec![0.5, 1.0]).investment(Investment::new(1.0)),
        ))
        .unwrap();
        es.add_component(Component::sink("demand", Flow::new(el).fixed(vec![1.0, 2.0])))
            .unwrap();
        let (lp, index) = assemble(&es, &[]).unwrap();
        // invest, pv[0], pv[1], demand[0], demand[1]
        assert_eq!(lp.variables().len(), 5);
        let solution = Solution {
            values: vec![2.0, 1.0, 2.0, 1.0, 2.0],
            objective: 2.0,
        };
        ResultSet::extract(&es, &index, &solution)
    }

    #[test]
    fn flows_are_keyed_by_labels() {
        let results = solved_by_hand();
        assert_eq!(
            results.flow("pv", "electricity").map(|f| f.values.clone()),
            Some(vec![1.0, 2.0])
        );
        assert_eq!(results.flow("electricity", "demand").map(FlowSeries::total), Some(3.0));
        assert!(results.flow("electricity", "nowhere").is_none());
    }

    #[test]
    fn investments_by_component() {
        let results = solved_by_hand();
        assert_eq!(results.investment("pv"), Some(2.0));
        assert_eq!(results.objective(), 2.0);
    }

    #[test]
    fn omitted_technologies_read_as_zero_and_typos_as_missing() {
        let results = solved_by_hand();
        assert_eq!(results.investment("solar_thermal"), Some(0.0));
        assert_eq!(results.investment("solar_termal"), None);
        // present, but not investable
        assert_eq!(results.investment("demand"), None);
    }

    #[test]
    fn bus_flows_and_component_totals_by_handle() {
        let results = solved_by_hand();
        let el = results.bus_id("electricity").unwrap();
        assert_eq!(results.flows_at(el).count(), 2);
        let pv = results.flow("pv", "electricity").unwrap().component_id;
        let demand = results.flow("electricity", "demand").unwrap().component_id;
        assert_eq!(results.component_output_total(pv), 3.0);
        assert_eq!(results.component_input_total(demand), 3.0);
        assert_eq!(results.size(pv), Some(2.0));
        assert_eq!(results.size(demand), None);
        assert_eq!(results.component_label(pv), "pv");
    }
}
