//! Topology graph: buses, components, and the flows wiring them together.
//!
//! Buses are balance points for one energy carrier. Components attach to
//! buses through directed [`Flow`]s. Every bus, component, and flow gets a
//! stable integer handle when it is added; labels exist only for reporting
//! and must be unique within one [`EnergySystem`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use super::investment::Investment;
use super::time_index::TimeIndex;
use crate::error::ConfigurationError;

/// Handle of a bus within one energy system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BusId(usize);

/// Handle of a component within one energy system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(usize);

/// Handle of a flow edge within one energy system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FlowId(usize);

impl BusId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ComponentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl FlowId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named commodity balance node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bus {
    pub label: String,
}

/// Directed, time-indexed quantity between a component and a bus.
///
/// Bounds are relative: with a nominal value (or an investment) the flow is
/// kept within `[min, max] * capacity`. A fixed profile pins the flow to
/// `fix[t] * capacity`, where capacity defaults to 1 when neither a nominal
/// value nor an investment is given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub bus: BusId,
    pub nominal_value: Option<f64>,
    pub fix: Option<Vec<f64>>,
    /// Relative lower bound.
    pub min: f64,
    /// Relative upper bound.
    pub max: f64,
    /// Cost per unit of flow and timestep.
    pub variable_cost: f64,
    pub investment: Option<Investment>,
}

impl Flow {
    /// Unconstrained, cost-free flow connected to `bus`.
    pub fn new(bus: BusId) -> Self {
        Self {
            bus,
            nominal_value: None,
            fix: None,
            min: 0.0,
            max: 1.0,
            variable_cost: 0.0,
            investment: None,
        }
    }

    pub fn nominal_value(mut self, value: f64) -> Self {
        self.nominal_value = Some(value);
        self
    }

    pub fn fixed(mut self, profile: Vec<f64>) -> Self {
        self.fix = Some(profile);
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn variable_cost(mut self, cost: f64) -> Self {
        self.variable_cost = cost;
        self
    }

    pub fn investment(mut self, investment: Investment) -> Self {
        self.investment = Some(investment);
        self
    }
}

/// Storage-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Storage {
    /// Fixed energy capacity; ignored when `investment` is set.
    pub nominal_capacity: Option<f64>,
    pub investment: Option<Investment>,
    /// Fraction of the content lost per timestep.
    pub loss_rate: f64,
    /// Content at the first timestep as a fraction of capacity.
    pub initial_level: f64,
    pub charge_efficiency: f64,
    pub discharge_efficiency: f64,
    /// Forces the last level to equal the first one.
    pub balanced: bool,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            nominal_capacity: None,
            investment: None,
            loss_rate: 0.0,
            initial_level: 0.0,
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
            balanced: false,
        }
    }
}

/// Component definition handed to [`EnergySystem::add_component`].
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// Single output flow, e.g. a grid connection or a collector field.
    Source { label: String, output: Flow },
    /// Single input flow, e.g. a fixed demand or an excess outlet.
    Sink { label: String, input: Flow },
    /// Inputs and outputs linked by fixed conversion factors.
    Transformer {
        label: String,
        inputs: Vec<(Flow, f64)>,
        outputs: Vec<(Flow, f64)>,
    },
    Storage {
        label: String,
        input: Flow,
        output: Flow,
        storage: Storage,
    },
}

impl Component {
    pub fn source(label: impl Into<String>, output: Flow) -> Self {
        Self::Source {
            label: label.into(),
            output,
        }
    }

    pub fn sink(label: impl Into<String>, input: Flow) -> Self {
        Self::Sink {
            label: label.into(),
            input,
        }
    }

    /// Transformer with one input (factor 1) and any number of outputs.
    pub fn transformer(label: impl Into<String>, input: Flow, outputs: Vec<(Flow, f64)>) -> Self {
        Self::Transformer {
            label: label.into(),
            inputs: vec![(input, 1.0)],
            outputs,
        }
    }

    pub fn storage(label: impl Into<String>, input: Flow, output: Flow, storage: Storage) -> Self {
        Self::Storage {
            label: label.into(),
            input,
            output,
            storage,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Source { label, .. }
            | Self::Sink { label, .. }
            | Self::Transformer { label, .. }
            | Self::Storage { label, .. } => label,
        }
    }
}

/// Orientation of a flow relative to its bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Component feeds the bus.
    IntoBus,
    /// Bus feeds the component.
    OutOfBus,
}

/// A registered flow together with its endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    pub component: ComponentId,
    pub direction: Direction,
    pub flow: Flow,
}

impl FlowEdge {
    pub fn bus(&self) -> BusId {
        self.flow.bus
    }
}

/// Registered component referring to its flows by handle.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Source {
        output: FlowId,
    },
    Sink {
        input: FlowId,
    },
    Transformer {
        inputs: Vec<(FlowId, f64)>,
        outputs: Vec<(FlowId, f64)>,
    },
    Storage {
        input: FlowId,
        output: FlowId,
        storage: Storage,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    pub label: String,
    pub kind: NodeKind,
}

impl ComponentNode {
    /// All flows attached to this component.
    pub fn flow_ids(&self) -> Vec<FlowId> {
        match &self.kind {
            NodeKind::Source { output } => vec![*output],
            NodeKind::Sink { input } => vec![*input],
            NodeKind::Transformer { inputs, outputs } => inputs
                .iter()
                .chain(outputs.iter())
                .map(|(id, _)| *id)
                .collect(),
            NodeKind::Storage { input, output, .. } => vec![*input, *output],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRef {
    Bus(BusId),
    Component(ComponentId),
}

/// The topology graph of one planning instance.
///
/// Owns its buses, components, and flows; several instances never share
/// state and can be built and solved independently.
#[derive(Debug, Clone)]
pub struct EnergySystem {
    time_index: TimeIndex,
    buses: Vec<Bus>,
    components: Vec<ComponentNode>,
    flows: Vec<FlowEdge>,
    labels: HashMap<String, NodeRef>,
    omitted: BTreeSet<String>,
}

impl EnergySystem {
    pub fn new(time_index: TimeIndex) -> Self {
        Self {
            time_index,
            buses: Vec::new(),
            components: Vec::new(),
            flows: Vec::new(),
            labels: HashMap::new(),
            omitted: BTreeSet::new(),
        }
    }

    pub fn time_index(&self) -> &TimeIndex {
        &self.time_index
    }

    /// Number of timesteps.
    pub fn horizon(&self) -> usize {
        self.time_index.len()
    }

    /// Adds a balance node.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLabel` if the label is already taken.
    pub fn add_bus(&mut self, label: impl Into<String>) -> Result<BusId, ConfigurationError> {
        let label = label.into();
        if self.is_taken(&label) {
            return Err(ConfigurationError::DuplicateLabel(label));
        }
        let id = BusId(self.buses.len());
        self.labels.insert(label.clone(), NodeRef::Bus(id));
        self.buses.push(Bus { label });
        Ok(id)
    }

    /// Registers a component and wires its flows to their buses.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLabel` for a label already in use, `UnknownBus` if a
    /// flow points at a bus of another system, and `InvalidParameter` for a
    /// transformer without inputs or outputs.
    pub fn add_component(&mut self, component: Component) -> Result<ComponentId, ConfigurationError> {
        let label = component.label().to_string();
        if self.is_taken(&label) {
            return Err(ConfigurationError::DuplicateLabel(label));
        }
        self.check_buses(&component)?;

        let id = ComponentId(self.components.len());
        let kind = match component {
            Component::Source { output, .. } => NodeKind::Source {
                output: self.push_flow(id, Direction::IntoBus, output),
            },
            Component::Sink { input, .. } => NodeKind::Sink {
                input: self.push_flow(id, Direction::OutOfBus, input),
            },
            Component::Transformer {
                inputs, outputs, ..
            } => {
                if inputs.is_empty() || outputs.is_empty() {
                    return Err(ConfigurationError::InvalidParameter {
                        label,
                        field: "flows",
                        message: "a transformer needs at least one input and one output".into(),
                    });
                }
                let inputs = inputs
                    .into_iter()
                    .map(|(flow, factor)| (self.push_flow(id, Direction::OutOfBus, flow), factor))
                    .collect();
                let outputs = outputs
                    .into_iter()
                    .map(|(flow, factor)| (self.push_flow(id, Direction::IntoBus, flow), factor))
                    .collect();
                NodeKind::Transformer { inputs, outputs }
            }
            Component::Storage {
                input,
                output,
                storage,
                ..
            } => NodeKind::Storage {
                input: self.push_flow(id, Direction::OutOfBus, input),
                output: self.push_flow(id, Direction::IntoBus, output),
                storage,
            },
        };

        self.labels.insert(label.clone(), NodeRef::Component(id));
        self.components.push(ComponentNode { label, kind });
        Ok(id)
    }

    /// Records a technology that was deliberately left out of the graph.
    ///
    /// Lookups of an omitted label resolve to "absent" instead of failing,
    /// and the label cannot be added later.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLabel` if the label is already registered or omitted.
    pub fn omit(&mut self, label: impl Into<String>) -> Result<(), ConfigurationError> {
        let label = label.into();
        if self.is_taken(&label) {
            return Err(ConfigurationError::DuplicateLabel(label));
        }
        self.omitted.insert(label);
        Ok(())
    }

    pub fn is_omitted(&self, label: &str) -> bool {
        self.omitted.contains(label)
    }

    /// Omitted labels in sorted order.
    pub fn omitted(&self) -> impl Iterator<Item = &str> {
        self.omitted.iter().map(String::as_str)
    }

    fn is_taken(&self, label: &str) -> bool {
        self.labels.contains_key(label) || self.omitted.contains(label)
    }

    fn check_buses(&self, component: &Component) -> Result<(), ConfigurationError> {
        let flows: Vec<&Flow> = match component {
            Component::Source { output, .. } => vec![output],
            Component::Sink { input, .. } => vec![input],
            Component::Transformer {
                inputs, outputs, ..
            } => inputs.iter().chain(outputs.iter()).map(|(f, _)| f).collect(),
            Component::Storage { input, output, .. } => vec![input, output],
        };
        match flows.iter().find(|f| f.bus.0 >= self.buses.len()) {
            Some(flow) => Err(ConfigurationError::UnknownBus {
                component: component.label().to_string(),
                bus: flow.bus.0,
            }),
            None => Ok(()),
        }
    }

    fn push_flow(&mut self, component: ComponentId, direction: Direction, flow: Flow) -> FlowId {
        let id = FlowId(self.flows.len());
        self.flows.push(FlowEdge {
            component,
            direction,
            flow,
        });
        id
    }

    pub fn buses(&self) -> impl Iterator<Item = (BusId, &Bus)> {
        self.buses.iter().enumerate().map(|(i, b)| (BusId(i), b))
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &ComponentNode)> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, c)| (ComponentId(i), c))
    }

    pub fn flows(&self) -> impl Iterator<Item = (FlowId, &FlowEdge)> {
        self.flows.iter().enumerate().map(|(i, f)| (FlowId(i), f))
    }

    pub fn bus(&self, id: BusId) -> &Bus {
        &self.buses[id.0]
    }

    pub fn component(&self, id: ComponentId) -> &ComponentNode {
        &self.components[id.0]
    }

    pub fn flow(&self, id: FlowId) -> &FlowEdge {
        &self.flows[id.0]
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn find_bus(&self, label: &str) -> Option<BusId> {
        match self.labels.get(label) {
            Some(NodeRef::Bus(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn find_component(&self, label: &str) -> Option<ComponentId> {
        match self.labels.get(label) {
            Some(NodeRef::Component(id)) => Some(*id),
            _ => None,
        }
    }

    /// The flow between a component and a bus in the given orientation.
    pub fn find_flow(&self, component: ComponentId, bus: BusId, direction: Direction) -> Option<FlowId> {
        self.flows().find_map(|(id, edge)| {
            (edge.component == component && edge.bus() == bus && edge.direction == direction)
                .then_some(id)
        })
    }

    /// Resolves a component label: `Some` if present, `None` if omitted.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComponent` for any other label.
    pub fn resolve_component(&self, label: &str) -> Result<Option<ComponentId>, ConfigurationError> {
        match self.find_component(label) {
            Some(id) => Ok(Some(id)),
            None if self.is_omitted(label) => Ok(None),
            None => Err(ConfigurationError::UnknownComponent(label.to_string())),
        }
    }

    /// Resolves the flow `from -> to`, where one end is a bus and the other a
    /// component. `None` if either end was omitted.
    ///
    /// # Errors
    ///
    /// Returns `UnknownFlow` if no such flow exists.
    pub fn resolve_flow(&self, from: &str, to: &str) -> Result<Option<FlowId>, ConfigurationError> {
        if self.is_omitted(from) || self.is_omitted(to) {
            return Ok(None);
        }
        let found = match (self.labels.get(from), self.labels.get(to)) {
            (Some(NodeRef::Component(c)), Some(NodeRef::Bus(b))) => self.find_flow(*c, *b, Direction::IntoBus),
            (Some(NodeRef::Bus(b)), Some(NodeRef::Component(c))) => self.find_flow(*c, *b, Direction::OutOfBus),
            _ => None,
        };
        found.map(Some).ok_or_else(|| ConfigurationError::UnknownFlow {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// `(source label, target label)` of a flow, e.g. `("PV", "electricity")`.
    pub fn flow_labels(&self, id: FlowId) -> (String, String) {
        let edge = self.flow(id);
        let component = self.component(edge.component).label.clone();
        let bus = self.bus(edge.bus()).label.clone();
        match edge.direction {
            Direction::IntoBus => (component, bus),
            Direction::OutOfBus => (bus, component),
        }
    }

    /// Flows touching `bus`, split into `(inflows, outflows)`.
    pub fn incident_flows(&self, bus: BusId) -> (Vec<FlowId>, Vec<FlowId>) {
        let mut inflows = Vec::new();
        let mut outflows = Vec::new();
        for (id, edge) in self.flows() {
            if edge.bus() != bus {
                continue;
            }
            match edge.direction {
                Direction::IntoBus => inflows.push(id),
                Direction::OutOfBus => outflows.push(id),
            }
        }
        (inflows, outflows)
    }

    /// Checks the complete graph before model assembly.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a bus without flows, a profile whose
    /// length differs from the horizon, inconsistent investment bounds, or an
    /// out-of-range flow/storage/conversion parameter.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (id, bus) in self.buses() {
            let (inflows, outflows) = self.incident_flows(id);
            if inflows.is_empty() && outflows.is_empty() {
                return Err(ConfigurationError::DanglingBus(bus.label.clone()));
            }
        }

        for (id, edge) in self.flows() {
            let (from, to) = self.flow_labels(id);
            validate_flow(&format!("{from}->{to}"), &edge.flow, self.horizon())?;
        }

        for (_, node) in self.components() {
            match &node.kind {
                NodeKind::Transformer { inputs, outputs } => {
                    for (_, factor) in inputs.iter().chain(outputs.iter()) {
                        if !(factor.is_finite() && *factor > 0.0) {
                            return Err(invalid(&node.label, "conversion_factor", "must be > 0"));
                        }
                    }
                }
                NodeKind::Storage { storage, .. } => validate_storage(&node.label, storage)?,
                NodeKind::Source { .. } | NodeKind::Sink { .. } => {}
            }
        }
        Ok(())
    }
}

fn invalid(label: &str, field: &'static str, message: &str) -> ConfigurationError {
    ConfigurationError::InvalidParameter {
        label: label.to_string(),
        field,
        message: message.to_string(),
    }
}

fn validate_investment(label: &str, investment: &Investment) -> Result<(), ConfigurationError> {
    if investment.minimum < 0.0 {
        return Err(invalid(label, "minimum", "must be >= 0"));
    }
    if !investment.bounds_consistent() {
        return Err(ConfigurationError::InvestmentBounds {
            label: label.to_string(),
            minimum: investment.minimum,
            maximum: investment.upper(),
        });
    }
    if !investment.ep_costs.is_finite() {
        return Err(invalid(label, "ep_costs", "must be finite"));
    }
    Ok(())
}

fn validate_flow(label: &str, flow: &Flow, horizon: usize) -> Result<(), ConfigurationError> {
    if flow.nominal_value.is_some() && flow.investment.is_some() {
        return Err(invalid(
            label,
            "nominal_value",
            "cannot be combined with an investment",
        ));
    }
    if let Some(nominal) = flow.nominal_value {
        if !(nominal.is_finite() && nominal >= 0.0) {
            return Err(invalid(label, "nominal_value", "must be a finite value >= 0"));
        }
    }
    if !(flow.min >= 0.0 && flow.min <= flow.max) {
        return Err(invalid(label, "min", "relative bounds need 0 <= min <= max"));
    }
    if !flow.variable_cost.is_finite() {
        return Err(invalid(label, "variable_cost", "must be finite"));
    }
    if let Some(profile) = &flow.fix {
        if profile.len() != horizon {
            return Err(ConfigurationError::ProfileLength {
                label: label.to_string(),
                expected: horizon,
                actual: profile.len(),
            });
        }
        if profile.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(invalid(label, "fix", "profile values must be finite and >= 0"));
        }
    }
    if let Some(investment) = &flow.investment {
        validate_investment(label, investment)?;
    }
    Ok(())
}

fn validate_storage(label: &str, storage: &Storage) -> Result<(), ConfigurationError> {
    match (&storage.investment, storage.nominal_capacity) {
        (Some(investment), _) => validate_investment(label, investment)?,
        (None, Some(capacity)) if capacity.is_finite() && capacity >= 0.0 => {}
        (None, Some(_)) => return Err(invalid(label, "nominal_capacity", "must be >= 0")),
        (None, None) => {
            return Err(invalid(
                label,
                "nominal_capacity",
                "a storage needs a fixed capacity or an investment",
            ));
        }
    }
    if !(0.0..=1.0).contains(&storage.loss_rate) {
        return Err(invalid(label, "loss_rate", "must be in [0, 1]"));
    }
    if !(0.0..=1.0).contains(&storage.initial_level) {
        return Err(invalid(label, "initial_level", "must be in [0, 1]"));
    }
    if !(storage.charge_efficiency > 0.0 && storage.charge_efficiency <= 1.0) {
        return Err(invalid(label, "charge_efficiency", "must be in (0, 1]"));
    }
    if !(storage.discharge_efficiency > 0.0 && storage.discharge_efficiency <= 1.0) {
        return Err(invalid(label, "discharge_efficiency", "must be in (0, 1]"));
    }
    Ok(())
}

impl fmt::Display for EnergySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buses, {} components, {} flows over {} timesteps",
            self.buses.len(),
            self.components.len(),
            self.flows.len(),
            self.horizon()
        )
    }
}
