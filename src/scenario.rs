//! Reference district topology built from a validated [`ScenarioConfig`].
//!
//! Buses for gas, electricity, and heat; grid connections and free excess
//! outlets; fixed demands; collectors sharing one roof area; gas boiler,
//! CHP, heat pump, battery, and thermal storage. A technology whose size
//! limit is zero is left out of the graph entirely and recorded as omitted.

use tracing::debug;

use crate::config::{CollectorConfig, ScenarioConfig, StorageConfig};
use crate::energy::assembler::SharedResource;
use crate::energy::investment::{Investment, annuity};
use crate::energy::kpi::{
    Accounting, CarrierAccount, EmissionSource, Purchase, StorageAccount, TechnologyCost,
};
use crate::energy::time_index::TimeIndex;
use crate::energy::topology::{BusId, Component, EnergySystem, Flow, FlowId, Storage};
use crate::error::ConfigurationError;
use crate::profiles::Profiles;

pub const GAS: &str = "gas";
pub const ELECTRICITY: &str = "electricity";
pub const HEAT: &str = "heat";

pub const GAS_GRID: &str = "gas_grid";
pub const ELECTRICITY_GRID: &str = "electricity_grid";
pub const HEAT_GRID: &str = "heat_grid";
pub const ELECTRICITY_EXCESS: &str = "electricity_excess";
pub const HEAT_EXCESS: &str = "heat_excess";
pub const ELECTRICITY_DEMAND: &str = "electricity_demand";
pub const HEAT_DEMAND: &str = "heat_demand";
pub const PV: &str = "pv";
pub const SOLAR_THERMAL: &str = "solar_thermal";
pub const GAS_BOILER: &str = "gas_boiler";
pub const CHP: &str = "chp";
pub const HEAT_PUMP: &str = "heat_pump";
pub const BATTERY: &str = "battery";
pub const HEAT_STORAGE: &str = "heat_storage";

/// Label of the roof-area constraint.
pub const COLLECTOR_AREA: &str = "collector_area";

/// Everything needed to assemble, solve, and evaluate one scenario.
#[derive(Debug, Clone)]
pub struct PlanningProblem {
    pub name: String,
    pub system: EnergySystem,
    pub shared: Vec<SharedResource>,
    pub accounting: Accounting,
}

/// Equivalent annual cost per unit for every technology, computed once.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Annuities {
    pv: f64,
    solar_thermal: f64,
    gas_boiler: f64,
    chp: f64,
    heat_pump: f64,
    battery: f64,
    heat_storage: f64,
}

impl Annuities {
    fn new(config: &ScenarioConfig) -> Result<Self, ConfigurationError> {
        let wacc = config.economics.wacc;
        let costed = |label: &str, capex: f64, lifetime: f64| {
            annuity(capex, lifetime, wacc).map_err(|source| ConfigurationError::Costing {
                label: label.to_string(),
                source,
            })
        };
        Ok(Self {
            pv: costed(PV, config.pv.capex, config.pv.lifetime)?,
            solar_thermal: costed(
                SOLAR_THERMAL,
                config.solar_thermal.capex,
                config.solar_thermal.lifetime,
            )?,
            gas_boiler: costed(GAS_BOILER, config.gas_boiler.capex, config.gas_boiler.lifetime)?,
            chp: costed(CHP, config.chp.capex, config.chp.lifetime)?,
            heat_pump: costed(HEAT_PUMP, config.heat_pump.capex, config.heat_pump.lifetime)?,
            battery: costed(BATTERY, config.battery.capex, config.battery.lifetime)?,
            heat_storage: costed(
                HEAT_STORAGE,
                config.heat_storage.capex,
                config.heat_storage.lifetime,
            )?,
        })
    }
}

/// Time index described by the `[simulation]` section.
///
/// # Errors
///
/// Returns `InvalidParameter` for a malformed start or zero step length.
pub fn time_index(config: &ScenarioConfig) -> Result<TimeIndex, ConfigurationError> {
    let s = &config.simulation;
    let start = s
        .start_datetime()
        .ok_or_else(|| ConfigurationError::InvalidParameter {
            label: "simulation".to_string(),
            field: "start",
            message: format!("cannot parse \"{}\"", s.start),
        })?;
    if s.step_minutes == 0 {
        return Err(ConfigurationError::InvalidParameter {
            label: "simulation".to_string(),
            field: "step_minutes",
            message: "must be > 0".to_string(),
        });
    }
    Ok(TimeIndex::new(start, s.step_minutes, s.horizon))
}

/// Builds the district topology, the collector-area constraint, and the
/// KPI accounting for one scenario.
///
/// # Errors
///
/// Returns a `ConfigurationError` if a profile does not cover the horizon,
/// an annuity cannot be computed, or the graph is rejected.
pub fn build(config: &ScenarioConfig, profiles: &Profiles) -> Result<PlanningProblem, ConfigurationError> {
    let index = time_index(config)?;
    let horizon = index.len();
    for (label, len) in [
        ("irradiance", profiles.irradiance_wh_m2.len()),
        ("electricity_share", profiles.electricity_share.len()),
        ("heat_share", profiles.heat_share.len()),
    ] {
        if len != horizon {
            return Err(ConfigurationError::ProfileLength {
                label: label.to_string(),
                expected: horizon,
                actual: len,
            });
        }
    }

    let annuities = Annuities::new(config)?;
    let mut es = EnergySystem::new(index);
    let gas = es.add_bus(GAS)?;
    let el = es.add_bus(ELECTRICITY)?;
    let heat = es.add_bus(HEAT)?;

    let p = &config.prices;
    es.add_component(Component::source(
        GAS_GRID,
        Flow::new(gas).variable_cost(p.gas + p.co2),
    ))?;
    es.add_component(Component::source(
        ELECTRICITY_GRID,
        Flow::new(el).variable_cost(p.electricity),
    ))?;
    es.add_component(Component::source(HEAT_GRID, Flow::new(heat).variable_cost(p.heat)))?;
    es.add_component(Component::sink(ELECTRICITY_EXCESS, Flow::new(el)))?;
    es.add_component(Component::sink(HEAT_EXCESS, Flow::new(heat)))?;

    if config.collectors.total_area_m2 > 0.0 {
        let irradiance = profiles.irradiance_kwh_m2();
        add_collector(&mut es, PV, el, &config.pv, &irradiance, annuities.pv)?;
        add_collector(
            &mut es,
            SOLAR_THERMAL,
            heat,
            &config.solar_thermal,
            &irradiance,
            annuities.solar_thermal,
        )?;
    } else {
        es.omit(PV)?;
        es.omit(SOLAR_THERMAL)?;
    }

    es.add_component(Component::sink(
        ELECTRICITY_DEMAND,
        Flow::new(el)
            .fixed(profiles.electricity_share.clone())
            .nominal_value(config.demand.electricity_kwh),
    ))?;
    es.add_component(Component::sink(
        HEAT_DEMAND,
        Flow::new(heat)
            .fixed(profiles.heat_share.clone())
            .nominal_value(config.demand.heat_kwh),
    ))?;

    let b = &config.gas_boiler;
    if b.max_kw > 0.0 {
        let size = Investment::new(annuities.gas_boiler)
            .with_minimum(b.min_kw)
            .with_maximum(b.max_kw);
        es.add_component(Component::transformer(
            GAS_BOILER,
            Flow::new(gas),
            vec![(Flow::new(heat).investment(size), b.efficiency)],
        ))?;
    } else {
        es.omit(GAS_BOILER)?;
    }

    let c = &config.chp;
    if c.max_kw > 0.0 {
        let size = Investment::new(annuities.chp)
            .with_minimum(c.min_kw)
            .with_maximum(c.max_kw);
        es.add_component(Component::transformer(
            CHP,
            Flow::new(gas),
            vec![
                (Flow::new(el), c.electrical_efficiency),
                (
                    Flow::new(heat).investment(size),
                    c.total_efficiency - c.electrical_efficiency,
                ),
            ],
        ))?;
    } else {
        es.omit(CHP)?;
    }

    let h = &config.heat_pump;
    if h.max_kw > 0.0 {
        let size = Investment::new(annuities.heat_pump)
            .with_minimum(h.min_kw)
            .with_maximum(h.max_kw);
        es.add_component(Component::transformer(
            HEAT_PUMP,
            Flow::new(el),
            vec![(Flow::new(heat).investment(size), h.cop)],
        ))?;
    } else {
        es.omit(HEAT_PUMP)?;
    }

    add_storage(&mut es, BATTERY, el, &config.battery, annuities.battery)?;
    add_storage(&mut es, HEAT_STORAGE, heat, &config.heat_storage, annuities.heat_storage)?;

    let shared = vec![
        SharedResource::new(COLLECTOR_AREA, config.collectors.total_area_m2)
            .member(PV, config.pv.area_yield)
            .member(SOLAR_THERMAL, config.solar_thermal.area_yield),
    ];

    let accounting = accounting(config, &annuities, &es, [el, heat])?;
    debug!(scenario = %config.scenario.name, system = %es, "district topology built");

    Ok(PlanningProblem {
        name: config.scenario.name.clone(),
        system: es,
        shared,
        accounting,
    })
}

/// Collector field on `bus`, sized in installed units.
///
/// The output profile is irradiance × area yield per installed unit, and the
/// minimum size is the minimum area × yield.
fn add_collector(
    es: &mut EnergySystem,
    label: &str,
    bus: BusId,
    config: &CollectorConfig,
    irradiance_kwh_m2: &[f64],
    ep_costs: f64,
) -> Result<(), ConfigurationError> {
    let profile = irradiance_kwh_m2
        .iter()
        .map(|i| i * config.area_yield)
        .collect();
    let size = Investment::new(ep_costs).with_minimum(config.min_area_m2 * config.area_yield);
    es.add_component(Component::source(
        label,
        Flow::new(bus).fixed(profile).investment(size),
    ))?;
    Ok(())
}

fn add_storage(
    es: &mut EnergySystem,
    label: &str,
    bus: BusId,
    config: &StorageConfig,
    ep_costs: f64,
) -> Result<(), ConfigurationError> {
    if config.max_kwh <= 0.0 {
        return es.omit(label);
    }
    let storage = Storage {
        nominal_capacity: None,
        investment: Some(
            Investment::new(ep_costs)
                .with_minimum(config.min_kwh)
                .with_maximum(config.max_kwh),
        ),
        loss_rate: config.loss_rate,
        initial_level: config.initial_level,
        charge_efficiency: config.charge_efficiency,
        discharge_efficiency: config.discharge_efficiency,
        balanced: config.balanced,
    };
    es.add_component(Component::storage(label, Flow::new(bus), Flow::new(bus), storage))?;
    Ok(())
}

/// KPI bookkeeping with every flow and component resolved against `es`.
///
/// # Errors
///
/// Returns `UnknownFlow` or `UnknownComponent` for a key that is neither in
/// the graph nor omitted.
fn accounting(
    config: &ScenarioConfig,
    annuities: &Annuities,
    es: &EnergySystem,
    [el, heat]: [BusId; 2],
) -> Result<Accounting, ConfigurationError> {
    let tech = |label: &str, unit: &'static str, ep_costs: f64, area_yield: Option<f64>| {
        Ok::<_, ConfigurationError>(TechnologyCost {
            label: label.to_string(),
            component: es.resolve_component(label)?,
            unit,
            ep_costs,
            area_yield,
        })
    };
    let flow = |from: &str, to: &str| es.resolve_flow(from, to);
    let present = |from: &str, to: &str| -> Result<Vec<FlowId>, ConfigurationError> {
        Ok(es.resolve_flow(from, to)?.into_iter().collect())
    };
    let storage = |label: &str, carrier: &str| {
        Ok::<_, ConfigurationError>(StorageAccount {
            label: label.to_string(),
            component: es.resolve_component(label)?,
            carrier: carrier.to_string(),
        })
    };
    let p = &config.prices;
    let e = &config.emissions;

    Ok(Accounting {
        technologies: vec![
            tech(PV, "kW", annuities.pv, Some(config.pv.area_yield))?,
            tech(
                SOLAR_THERMAL,
                "kW",
                annuities.solar_thermal,
                Some(config.solar_thermal.area_yield),
            )?,
            tech(GAS_BOILER, "kW", annuities.gas_boiler, None)?,
            tech(CHP, "kW", annuities.chp, None)?,
            tech(HEAT_PUMP, "kW", annuities.heat_pump, None)?,
            tech(BATTERY, "kWh", annuities.battery, None)?,
            tech(HEAT_STORAGE, "kWh", annuities.heat_storage, None)?,
        ],
        purchases: vec![
            Purchase {
                label: "gas".to_string(),
                flow: flow(GAS_GRID, GAS)?,
                price: p.gas,
            },
            Purchase {
                label: "co2".to_string(),
                flow: flow(GAS_GRID, GAS)?,
                price: p.co2,
            },
            Purchase {
                label: "electricity_import".to_string(),
                flow: flow(ELECTRICITY_GRID, ELECTRICITY)?,
                price: p.electricity,
            },
            Purchase {
                label: "heat_import".to_string(),
                flow: flow(HEAT_GRID, HEAT)?,
                price: p.heat,
            },
        ],
        emissions: vec![
            EmissionSource {
                label: GAS_BOILER.to_string(),
                flow: flow(GAS, GAS_BOILER)?,
                factor: e.gas,
            },
            EmissionSource {
                label: CHP.to_string(),
                flow: flow(GAS, CHP)?,
                factor: e.gas,
            },
            EmissionSource {
                label: "electricity_import".to_string(),
                flow: flow(ELECTRICITY_GRID, ELECTRICITY)?,
                factor: e.electricity,
            },
            EmissionSource {
                label: "heat_import".to_string(),
                flow: flow(HEAT_GRID, HEAT)?,
                factor: e.heat,
            },
        ],
        carriers: vec![
            CarrierAccount {
                carrier: ELECTRICITY.to_string(),
                bus: el,
                demand: present(ELECTRICITY, ELECTRICITY_DEMAND)?,
                imports: present(ELECTRICITY_GRID, ELECTRICITY)?,
                excess: present(ELECTRICITY, ELECTRICITY_EXCESS)?,
            },
            CarrierAccount {
                carrier: HEAT.to_string(),
                bus: heat,
                demand: present(HEAT, HEAT_DEMAND)?,
                imports: present(HEAT_GRID, HEAT)?,
                excess: present(HEAT, HEAT_EXCESS)?,
            },
        ],
        storages: vec![storage(BATTERY, ELECTRICITY)?, storage(HEAT_STORAGE, HEAT)?],
    })
}
