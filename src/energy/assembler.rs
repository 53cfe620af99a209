//! Model assembly: turns an [`EnergySystem`] into a [`LinearProgram`].
//!
//! Variables are created per flow and timestep, per investment, and per
//! storage level. Constraint names carry the component/bus label and the
//! timestep so an infeasibility report points at the offending row.

use tracing::debug;

use super::lp::{LinearExpr, LinearProgram, Relation, VarId};
use super::topology::{ComponentId, EnergySystem, FlowId, NodeKind, Storage};
use crate::error::ConfigurationError;

/// A finite resource consumed by the investments of several components.
///
/// Produces `Σ invest_i / yield_i <= limit` over the members present in the
/// system. Members the builder omitted contribute no term; when none is
/// present the constraint is not emitted at all. Any other unknown member is
/// an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedResource {
    pub label: String,
    pub limit: f64,
    /// `(component label, yield per unit of resource)`.
    pub members: Vec<(String, f64)>,
}

impl SharedResource {
    pub fn new(label: impl Into<String>, limit: f64) -> Self {
        Self {
            label: label.into(),
            limit,
            members: Vec::new(),
        }
    }

    pub fn member(mut self, component: impl Into<String>, yield_per_unit: f64) -> Self {
        self.members.push((component.into(), yield_per_unit));
        self
    }
}

/// Maps topology handles to the variables created for them.
#[derive(Debug, Clone, Default)]
pub struct ModelIndex {
    /// `flow_vars[flow][t]`.
    pub flow_vars: Vec<Vec<VarId>>,
    /// Investment variable per flow, if the flow is investable.
    pub flow_investments: Vec<Option<VarId>>,
    /// Level variables per component; only storages have them.
    pub storage_levels: Vec<Option<Vec<VarId>>>,
    /// Capacity investment per component; only investable storages have one.
    pub storage_investments: Vec<Option<VarId>>,
}

impl ModelIndex {
    pub fn flow_var(&self, flow: FlowId, t: usize) -> VarId {
        self.flow_vars[flow.index()][t]
    }

    /// The investment variable that sizes a component.
    ///
    /// A storage is sized by its energy capacity; any other component by the
    /// first investable flow it owns.
    pub fn component_investment(&self, system: &EnergySystem, component: ComponentId) -> Option<VarId> {
        if let Some(var) = self.storage_investments[component.index()] {
            return Some(var);
        }
        system
            .component(component)
            .flow_ids()
            .into_iter()
            .find_map(|f| self.flow_investments[f.index()])
    }
}

/// Builds the complete linear program for `system`.
///
/// # Errors
///
/// Returns a `ConfigurationError` if the topology fails validation, a shared
/// resource has a non-positive yield or limit, or a shared-resource member
/// is unknown or carries no investment.
pub fn assemble(
    system: &EnergySystem,
    shared: &[SharedResource],
) -> Result<(LinearProgram, ModelIndex), ConfigurationError> {
    system.validate()?;

    let horizon = system.horizon();
    let mut lp = LinearProgram::new();
    let mut index = ModelIndex {
        flow_vars: Vec::with_capacity(system.flow_count()),
        flow_investments: Vec::with_capacity(system.flow_count()),
        storage_levels: vec![None; system.components().count()],
        storage_investments: vec![None; system.components().count()],
    };

    for (id, _) in system.flows() {
        add_flow(system, &mut lp, &mut index, id, horizon);
    }

    for (id, bus) in system.buses() {
        let (inflows, outflows) = system.incident_flows(id);
        for t in 0..horizon {
            let mut expr = LinearExpr::new();
            for f in &inflows {
                expr.add_term(index.flow_var(*f, t), 1.0);
            }
            for f in &outflows {
                expr.add_term(index.flow_var(*f, t), -1.0);
            }
            lp.add_constraint(format!("balance_{}_{t}", bus.label), expr, Relation::Eq, 0.0);
        }
    }

    for (id, node) in system.components() {
        match &node.kind {
            NodeKind::Transformer { inputs, outputs } => {
                for (input, in_factor) in inputs {
                    for (output, out_factor) in outputs {
                        let (_, out_bus) = system.flow_labels(*output);
                        for t in 0..horizon {
                            // input * factor_out = output * factor_in
                            let expr = LinearExpr::new()
                                .term(index.flow_var(*input, t), *out_factor)
                                .term(index.flow_var(*output, t), -*in_factor);
                            lp.add_constraint(
                                format!("conversion_{}_{}_{t}", node.label, out_bus),
                                expr,
                                Relation::Eq,
                                0.0,
                            );
                        }
                    }
                }
            }
            NodeKind::Storage {
                input,
                output,
                storage,
            } => add_storage(
                &mut lp,
                &mut index,
                id,
                &node.label,
                (*input, *output),
                storage,
                horizon,
            ),
            NodeKind::Source { .. } | NodeKind::Sink { .. } => {}
        }
    }

    for resource in shared {
        add_shared_resource(system, &mut lp, &index, resource)?;
    }

    debug!(
        variables = lp.variables().len(),
        constraints = lp.constraints().len(),
        horizon,
        "assembled linear program"
    );
    Ok((lp, index))
}

fn add_flow(
    system: &EnergySystem,
    lp: &mut LinearProgram,
    index: &mut ModelIndex,
    id: FlowId,
    horizon: usize,
) {
    let flow = &system.flow(id).flow;
    let (from, to) = system.flow_labels(id);

    let invest = flow.investment.as_ref().map(|inv| {
        let var = lp.add_variable(format!("invest_{from}_{to}"), inv.minimum, inv.upper());
        lp.add_objective_term(var, inv.ep_costs);
        var
    });

    let (lower, upper) = match (flow.nominal_value, &flow.fix, invest) {
        (Some(nominal), None, None) => (flow.min * nominal, flow.max * nominal),
        _ => (0.0, f64::INFINITY),
    };

    let mut vars = Vec::with_capacity(horizon);
    for t in 0..horizon {
        let var = lp.add_variable(format!("flow_{from}_{to}_{t}"), lower, upper);
        lp.add_objective_term(var, flow.variable_cost);

        match (&flow.fix, invest) {
            (Some(profile), Some(capacity)) => {
                let expr = LinearExpr::new().term(var, 1.0).term(capacity, -profile[t]);
                lp.add_constraint(format!("fixed_{from}_{to}_{t}"), expr, Relation::Eq, 0.0);
            }
            (Some(profile), None) => {
                let nominal = flow.nominal_value.unwrap_or(1.0);
                let expr = LinearExpr::new().term(var, 1.0);
                lp.add_constraint(
                    format!("fixed_{from}_{to}_{t}"),
                    expr,
                    Relation::Eq,
                    profile[t] * nominal,
                );
            }
            (None, Some(capacity)) => {
                let expr = LinearExpr::new().term(var, 1.0).term(capacity, -flow.max);
                lp.add_constraint(format!("capacity_{from}_{to}_{t}"), expr, Relation::Le, 0.0);
                if flow.min > 0.0 {
                    let expr = LinearExpr::new().term(var, 1.0).term(capacity, -flow.min);
                    lp.add_constraint(format!("minimum_{from}_{to}_{t}"), expr, Relation::Ge, 0.0);
                }
            }
            (None, None) => {}
        }
        vars.push(var);
    }

    index.flow_vars.push(vars);
    index.flow_investments.push(invest);
}

fn add_storage(
    lp: &mut LinearProgram,
    index: &mut ModelIndex,
    id: ComponentId,
    label: &str,
    (input, output): (FlowId, FlowId),
    storage: &Storage,
    horizon: usize,
) {
    let invest = storage.investment.as_ref().map(|inv| {
        let var = lp.add_variable(format!("invest_{label}"), inv.minimum, inv.upper());
        lp.add_objective_term(var, inv.ep_costs);
        var
    });
    let nominal = storage.nominal_capacity.unwrap_or(0.0);
    let level_upper = if invest.is_some() {
        f64::INFINITY
    } else {
        nominal
    };

    let levels: Vec<VarId> = (0..horizon)
        .map(|t| lp.add_variable(format!("level_{label}_{t}"), 0.0, level_upper))
        .collect();

    if let Some(capacity) = invest {
        for (t, level) in levels.iter().enumerate() {
            let expr = LinearExpr::new().term(*level, 1.0).term(capacity, -1.0);
            lp.add_constraint(format!("level_cap_{label}_{t}"), expr, Relation::Le, 0.0);
        }
    }

    if let Some(first) = levels.first() {
        let mut expr = LinearExpr::new().term(*first, 1.0);
        let rhs = match invest {
            Some(capacity) => {
                expr.add_term(capacity, -storage.initial_level);
                0.0
            }
            None => storage.initial_level * nominal,
        };
        lp.add_constraint(format!("initial_level_{label}"), expr, Relation::Eq, rhs);

        // The first step only anchors the level; no energy moves through it.
        for (name, flow) in [("charge", input), ("discharge", output)] {
            let expr = LinearExpr::new().term(index.flow_var(flow, 0), 1.0);
            lp.add_constraint(format!("anchor_{name}_{label}"), expr, Relation::Eq, 0.0);
        }
    }

    for t in 1..horizon {
        let expr = LinearExpr::new()
            .term(levels[t], 1.0)
            .term(levels[t - 1], -(1.0 - storage.loss_rate))
            .term(index.flow_var(input, t), -storage.charge_efficiency)
            .term(index.flow_var(output, t), 1.0 / storage.discharge_efficiency);
        lp.add_constraint(format!("storage_{label}_{t}"), expr, Relation::Eq, 0.0);
    }

    if storage.balanced && horizon > 1 {
        let expr = LinearExpr::new()
            .term(levels[horizon - 1], 1.0)
            .term(levels[0], -1.0);
        lp.add_constraint(format!("balanced_{label}"), expr, Relation::Eq, 0.0);
    }

    index.storage_levels[id.index()] = Some(levels);
    index.storage_investments[id.index()] = invest;
}

fn add_shared_resource(
    system: &EnergySystem,
    lp: &mut LinearProgram,
    index: &ModelIndex,
    resource: &SharedResource,
) -> Result<(), ConfigurationError> {
    if !(resource.limit.is_finite() && resource.limit >= 0.0) {
        return Err(ConfigurationError::InvalidParameter {
            label: resource.label.clone(),
            field: "limit",
            message: format!("must be a finite value >= 0, got {}", resource.limit),
        });
    }

    let mut expr = LinearExpr::new();
    for (member, yield_per_unit) in &resource.members {
        if !(yield_per_unit.is_finite() && *yield_per_unit > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                label: member.clone(),
                field: "yield",
                message: format!("must be > 0, got {yield_per_unit}"),
            });
        }
        let Some(component) = system.resolve_component(member)? else {
            continue;
        };
        let var = index
            .component_investment(system, component)
            .ok_or_else(|| ConfigurationError::InvalidParameter {
                label: member.clone(),
                field: "investment",
                message: format!("member of `{}` has no investment", resource.label),
            })?;
        expr.add_term(var, 1.0 / yield_per_unit);
    }

    if expr.is_empty() {
        debug!(resource = %resource.label, "no member present, constraint skipped");
        return Ok(());
    }
    lp.add_constraint(
        format!("shared_{}", resource.label),
        expr,
        Relation::Le,
        resource.limit,
    );
    Ok(())
}
