//! Post-hoc KPI computation from a solved [`ResultSet`].
//!
//! Every KPI is a pure function of the result set and the [`Accounting`]
//! parameters captured when the scenario was built. Accounting entries hold
//! handles resolved against the built system; `None` marks a technology the
//! builder omitted, which counts as zero. Ratio KPIs that are
//! undefined for the solved system are reported as [`KpiValue::Undefined`]
//! without affecting the others.

use std::fmt;

use serde::{Serialize, Serializer};

use super::balance::bus_totals;
use super::results::ResultSet;
use super::topology::{BusId, ComponentId, Direction, FlowId};
use crate::error::KpiDomainError;

/// Capacities at or below this are treated as not installed.
pub const CAPACITY_EPSILON: f64 = 1e-6;

/// Emission factors are given per gram; totals are reported in tonnes.
const GRAMS_PER_TONNE: f64 = 1e6;

/// Annualized cost parameters of one investable technology.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologyCost {
    pub label: String,
    pub component: Option<ComponentId>,
    pub unit: &'static str,
    pub ep_costs: f64,
    /// Output per installed m²; reported sizes are also converted to area.
    pub area_yield: Option<f64>,
}

/// A flow purchased at a fixed price per unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub label: String,
    pub flow: Option<FlowId>,
    pub price: f64,
}

/// A flow whose consumption emits CO₂, factor in g per unit.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionSource {
    pub label: String,
    pub flow: Option<FlowId>,
    pub factor: f64,
}

/// Demand and external supply of one energy carrier.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierAccount {
    pub carrier: String,
    pub bus: BusId,
    pub demand: Vec<FlowId>,
    pub imports: Vec<FlowId>,
    /// Surplus dumped without use.
    pub excess: Vec<FlowId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccount {
    pub label: String,
    pub component: Option<ComponentId>,
    pub carrier: String,
}

/// Parameters the KPI engine needs besides the solved flows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accounting {
    pub technologies: Vec<TechnologyCost>,
    pub purchases: Vec<Purchase>,
    pub emissions: Vec<EmissionSource>,
    pub carriers: Vec<CarrierAccount>,
    pub storages: Vec<StorageAccount>,
}

/// A KPI value, or the reason it is undefined.
#[derive(Debug, Clone, PartialEq)]
pub enum KpiValue {
    Value(f64),
    Undefined(KpiDomainError),
}

impl KpiValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Undefined(_) => None,
        }
    }

    fn from_result(result: Result<f64, KpiDomainError>) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(e) => Self::Undefined(e),
        }
    }
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::Undefined(reason) => write!(f, "n/a ({reason})"),
        }
    }
}

impl Serialize for KpiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::Undefined(reason) => serializer.serialize_str(&format!("undefined: {reason}")),
        }
    }
}

/// Grouping used for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Investment,
    Cost,
    Emissions,
    SelfSufficiency,
    Storage,
    EnergyBalance,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Investment => "Investment",
            Self::Cost => "Costs",
            Self::Emissions => "Emissions",
            Self::SelfSufficiency => "Self-sufficiency",
            Self::Storage => "Storage",
            Self::EnergyBalance => "Energy balance",
        };
        f.write_str(name)
    }
}

/// One named indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub key: String,
    pub section: Section,
    pub unit: &'static str,
    pub value: KpiValue,
}

/// Aggregate KPIs derived from a complete result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    pub kpis: Vec<Kpi>,
}

impl KpiReport {
    /// Computes all KPIs.
    ///
    /// # Arguments
    ///
    /// * `results` - Solved flows, investments, and storage levels
    /// * `accounting` - Prices, emission factors, and carrier bookkeeping
    ///
    /// # Returns
    ///
    /// A `KpiReport`; undefined ratios are reported in place.
    pub fn from_results(results: &ResultSet, accounting: &Accounting) -> Self {
        let mut report = Self { kpis: Vec::new() };

        let mut total_annuity = 0.0;
        for tech in &accounting.technologies {
            let size = tech.component.and_then(|c| results.size(c)).unwrap_or(0.0);
            report.push(format!("invest_{}", tech.label), Section::Investment, tech.unit, Ok(size));
            if let Some(area_yield) = tech.area_yield {
                report.push(format!("area_{}", tech.label), Section::Investment, "m2", Ok(size / area_yield));
            }
            let annuity = size * tech.ep_costs;
            total_annuity += annuity;
            report.push(format!("annuity_{}", tech.label), Section::Cost, "EUR/a", Ok(annuity));
        }
        report.push("annuity_total", Section::Cost, "EUR/a", Ok(total_annuity));

        let mut total_variable = 0.0;
        for purchase in &accounting.purchases {
            let cost = flow_total(results, purchase.flow) * purchase.price;
            total_variable += cost;
            report.push(format!("variable_cost_{}", purchase.label), Section::Cost, "EUR/a", Ok(cost));
        }
        report.push("variable_cost_total", Section::Cost, "EUR/a", Ok(total_variable));
        report.push("total_cost", Section::Cost, "EUR/a", Ok(total_annuity + total_variable));

        let mut total_emissions = 0.0;
        for source in &accounting.emissions {
            let tonnes = flow_total(results, source.flow) * source.factor / GRAMS_PER_TONNE;
            total_emissions += tonnes;
            report.push(format!("co2_{}", source.label), Section::Emissions, "t/a", Ok(tonnes));
        }
        report.push("co2_total", Section::Emissions, "t/a", Ok(total_emissions));

        let mut ratios = Vec::new();
        for account in &accounting.carriers {
            let ratio = self_sufficiency(results, account);
            ratios.push(ratio.clone());
            report.push(
                format!("self_sufficiency_{}", account.carrier),
                Section::SelfSufficiency,
                "-",
                ratio,
            );
        }
        if !ratios.is_empty() {
            report.push("self_sufficiency_total", Section::SelfSufficiency, "-", mean_ratio(&ratios));
        }

        for storage in &accounting.storages {
            let demand = accounting
                .carriers
                .iter()
                .find(|c| c.carrier == storage.carrier)
                .map(|c| carrier_demand(results, c))
                .unwrap_or(0.0);
            let cycles = match storage.component {
                Some(id) => full_cycles(results, id),
                None => Err(not_installed(&storage.label)),
            };
            report.push(format!("full_cycles_{}", storage.label), Section::Storage, "-", cycles);
            report.push(
                format!("discharge_share_{}", storage.label),
                Section::Storage,
                "-",
                discharge_share(results, storage, demand),
            );
        }

        for account in &accounting.carriers {
            report.push_energy_balance(results, account);
        }

        report
    }

    fn push(
        &mut self,
        key: impl Into<String>,
        section: Section,
        unit: &'static str,
        value: Result<f64, KpiDomainError>,
    ) {
        self.kpis.push(Kpi {
            key: key.into(),
            section,
            unit,
            value: KpiValue::from_result(value),
        });
    }

    fn push_energy_balance(&mut self, results: &ResultSet, account: &CarrierAccount) {
        let carrier = &account.carrier;
        let totals = bus_totals(results, account.bus);
        self.push(
            format!("demand_{carrier}"),
            Section::EnergyBalance,
            "MWh",
            Ok(carrier_demand(results, account) / 1000.0),
        );
        self.push(
            format!("excess_{carrier}"),
            Section::EnergyBalance,
            "MWh",
            Ok(sum_flows(results, &account.excess) / 1000.0),
        );
        self.push(
            format!("supply_{carrier}"),
            Section::EnergyBalance,
            "MWh",
            Ok(totals.supplied / 1000.0),
        );
        for flow in results
            .flows_at(account.bus)
            .filter(|f| f.direction == Direction::IntoBus)
        {
            self.push(
                format!("supply_{carrier}_{}", flow.component),
                Section::EnergyBalance,
                "MWh",
                Ok(flow.total() / 1000.0),
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<&Kpi> {
        self.kpis.iter().find(|k| k.key == key)
    }

    /// Numeric value of a KPI; `None` if missing or undefined.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|k| k.value.as_f64())
    }
}

fn flow_total(results: &ResultSet, flow: Option<FlowId>) -> f64 {
    flow.map_or(0.0, |id| results.flow_sum(id))
}

fn sum_flows(results: &ResultSet, flows: &[FlowId]) -> f64 {
    flows.iter().map(|id| results.flow_sum(*id)).sum()
}

fn carrier_demand(results: &ResultSet, account: &CarrierAccount) -> f64 {
    sum_flows(results, &account.demand)
}

/// `(demand − imports) / demand` for one carrier.
///
/// # Errors
///
/// `ZeroDemand` when the carrier has no demand over the horizon.
pub fn self_sufficiency(results: &ResultSet, account: &CarrierAccount) -> Result<f64, KpiDomainError> {
    let demand = carrier_demand(results, account);
    if demand == 0.0 {
        return Err(KpiDomainError::ZeroDemand {
            carrier: account.carrier.clone(),
        });
    }
    let imports = sum_flows(results, &account.imports);
    Ok((demand - imports) / demand)
}

fn mean_ratio(ratios: &[Result<f64, KpiDomainError>]) -> Result<f64, KpiDomainError> {
    let mut sum = 0.0;
    for ratio in ratios {
        match ratio {
            Ok(v) => sum += v,
            Err(e) => return Err(KpiDomainError::Dependent(e.to_string())),
        }
    }
    Ok(sum / ratios.len() as f64)
}

/// Total charged energy divided by installed capacity.
///
/// # Errors
///
/// `NotInstalled` when the storage is absent or its capacity is zero.
pub fn full_cycles(results: &ResultSet, storage: ComponentId) -> Result<f64, KpiDomainError> {
    let capacity = installed_capacity(results, storage)?;
    Ok(results.component_input_total(storage) / capacity)
}

fn discharge_share(
    results: &ResultSet,
    storage: &StorageAccount,
    demand: f64,
) -> Result<f64, KpiDomainError> {
    let id = storage.component.ok_or_else(|| not_installed(&storage.label))?;
    installed_capacity(results, id)?;
    if demand == 0.0 {
        return Err(KpiDomainError::ZeroDemand {
            carrier: storage.carrier.clone(),
        });
    }
    Ok(results.component_output_total(id) / demand)
}

fn installed_capacity(results: &ResultSet, storage: ComponentId) -> Result<f64, KpiDomainError> {
    results
        .storage_of(storage)
        .map(|s| s.capacity)
        .filter(|c| *c > CAPACITY_EPSILON)
        .ok_or_else(|| not_installed(results.component_label(storage)))
}

fn not_installed(storage: &str) -> KpiDomainError {
    KpiDomainError::NotInstalled {
        storage: storage.to_string(),
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        let mut current = None;
        for kpi in &self.kpis {
            if current != Some(kpi.section) {
                writeln!(f, "[{}]", kpi.section)?;
                current = Some(kpi.section);
            }
            writeln!(f, "  {:<40} {:>14} {}", kpi.key, kpi.value.to_string(), kpi.unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::assembler::assemble;
    use crate::energy::investment::Investment;
    use crate::energy::solver::Solution;
    use crate::energy::time_index::TimeIndex;
    use crate::energy::topology::{Component, EnergySystem, Flow, Storage};

    /// PV (invest 2), grid import, battery (capacity from values), demand.
    fn system() -> EnergySystem {
        let mut es = EnergySystem::new(TimeIndex::hourly_from_2019(2));
        let el = es.add_bus("electricity").unwrap();
        es.add_component(Component::source(
            "pv",
            Flow::new(el).fixed(vec![0.5, 0.5]).investment(Investment::new(10.0)),
        ))
        .unwrap();
        es.add_component(Component::source("grid", Flow::new(el).variable_cost(0.3)))
            .unwrap();
        es.add_component(Component::storage(
            "battery",
            Flow::new(el),
            Flow::new(el),
            Storage {
                investment: Some(Investment::new(5.0)),
                ..Storage::default()
            },
        ))
        .unwrap();
        es.add_component(Component::sink("demand", Flow::new(el).fixed(vec![1.0, 1.0])))
            .unwrap();
        es.omit("heat_storage").unwrap();
        es
    }

    fn results(battery_capacity: f64, demand: [f64; 2]) -> ResultSet {
        let es = system();
        let (_, index) = assemble(&es, &[]).unwrap();
        // order: pv invest, pv x2, grid x2, battery in x2, battery out x2,
        // demand x2, battery invest, battery levels x2
        let values = vec![
            2.0, 1.0, 1.0, // pv
            1.0, 0.0, // grid
            0.0, 1.0, // battery in
            0.0, 0.0, // battery out
            demand[0], demand[1], // demand
            battery_capacity, 0.0, 1.0,
        ];
        ResultSet::extract(&es, &index, &Solution { values, objective: 0.0 })
    }

    fn accounting() -> Accounting {
        let es = system();
        let flow = |from: &str, to: &str| es.resolve_flow(from, to).unwrap();
        let component = |label: &str| es.resolve_component(label).unwrap();
        let grid = flow("grid", "electricity");
        Accounting {
            technologies: vec![
                TechnologyCost {
                    label: "pv".into(),
                    component: component("pv"),
                    unit: "kW",
                    ep_costs: 10.0,
                    area_yield: Some(0.2),
                },
                TechnologyCost {
                    label: "battery".into(),
                    component: component("battery"),
                    unit: "kWh",
                    ep_costs: 5.0,
                    area_yield: None,
                },
            ],
            purchases: vec![Purchase {
                label: "electricity_import".into(),
                flow: grid,
                price: 0.3,
            }],
            emissions: vec![EmissionSource {
                label: "electricity_import".into(),
                flow: grid,
                factor: 400.0,
            }],
            carriers: vec![CarrierAccount {
                carrier: "electricity".into(),
                bus: es.find_bus("electricity").unwrap(),
                demand: flow("electricity", "demand").into_iter().collect(),
                imports: grid.into_iter().collect(),
                excess: vec![],
            }],
            storages: vec![
                StorageAccount {
                    label: "battery".into(),
                    component: component("battery"),
                    carrier: "electricity".into(),
                },
                StorageAccount {
                    label: "heat_storage".into(),
                    component: component("heat_storage"),
                    carrier: "heat".into(),
                },
            ],
        }
    }

    #[test]
    fn costs_add_up() {
        let report = KpiReport::from_results(&results(4.0, [2.0, 0.0]), &accounting());
        assert_eq!(report.value("invest_pv"), Some(2.0));
        assert_eq!(report.value("area_pv"), Some(10.0));
        assert_eq!(report.value("annuity_total"), Some(2.0 * 10.0 + 4.0 * 5.0));
        assert!((report.value("variable_cost_total").unwrap() - 0.3).abs() < 1e-12);
        assert!((report.value("total_cost").unwrap() - 40.3).abs() < 1e-12);
    }

    #[test]
    fn emissions_in_tonnes() {
        let report = KpiReport::from_results(&results(4.0, [2.0, 0.0]), &accounting());
        assert!((report.value("co2_total").unwrap() - 400.0 / 1e6).abs() < 1e-15);
    }

    #[test]
    fn self_sufficiency_ratio() {
        let report = KpiReport::from_results(&results(4.0, [2.0, 0.0]), &accounting());
        // demand 2, import 1
        assert_eq!(report.value("self_sufficiency_electricity"), Some(0.5));
        assert_eq!(report.value("self_sufficiency_total"), Some(0.5));
    }

    #[test]
    fn zero_demand_is_undefined_not_fatal() {
        let report = KpiReport::from_results(&results(4.0, [0.0, 0.0]), &accounting());
        let kpi = report.get("self_sufficiency_electricity").unwrap();
        assert!(matches!(
            kpi.value,
            KpiValue::Undefined(KpiDomainError::ZeroDemand { .. })
        ));
        assert!(matches!(
            report.get("self_sufficiency_total").map(|k| &k.value),
            Some(KpiValue::Undefined(KpiDomainError::Dependent(_)))
        ));
        // everything else is still computed
        assert_eq!(report.value("invest_pv"), Some(2.0));
    }

    #[test]
    fn storage_cycles() {
        let report = KpiReport::from_results(&results(4.0, [2.0, 0.0]), &accounting());
        assert_eq!(report.value("full_cycles_battery"), Some(0.25));
        assert_eq!(report.value("discharge_share_battery"), Some(0.0));
    }

    #[test]
    fn storage_not_installed() {
        let report = KpiReport::from_results(&results(0.0, [2.0, 0.0]), &accounting());
        let value = &report.get("full_cycles_battery").unwrap().value;
        assert_eq!(
            value,
            &KpiValue::Undefined(KpiDomainError::NotInstalled {
                storage: "battery".into()
            })
        );
        assert!(value.to_string().contains("not installed"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let results = results(4.0, [2.0, 0.0]);
        let first = KpiReport::from_results(&results, &accounting());
        let second = KpiReport::from_results(&results, &accounting());
        assert_eq!(first, second);
    }

    #[test]
    fn display_groups_sections() {
        let report = KpiReport::from_results(&results(4.0, [2.0, 0.0]), &accounting());
        let text = report.to_string();
        assert!(text.starts_with("--- KPI Report ---"));
        assert!(text.contains("[Self-sufficiency]"));
        assert!(text.contains("invest_pv"));
    }

    #[test]
    fn omitted_storage_is_not_installed() {
        let report = KpiReport::from_results(&results(4.0, [2.0, 0.0]), &accounting());
        assert_eq!(
            report.get("full_cycles_heat_storage").map(|k| &k.value),
            Some(&KpiValue::Undefined(KpiDomainError::NotInstalled {
                storage: "heat_storage".into()
            }))
        );
    }

    #[test]
    fn accounting_keys_must_resolve() {
        let es = system();
        assert!(es.resolve_flow("grid", "heat").is_err());
        assert!(es.resolve_component("batery").is_err());
        assert_eq!(es.resolve_component("heat_storage"), Ok(None));
    }
}
