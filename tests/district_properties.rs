//! Invariants of the solved reference district over short horizons.

#![cfg(feature = "solver-clarabel")]

mod common;

use common::{TOL, assert_close, build_problem, short_preset, size, solve_config};
use district_planner::energy::assembler::assemble;
use district_planner::energy::balance::check_balance;
use district_planner::energy::investment::annuity;
use district_planner::energy::kpi::KpiReport;
use district_planner::energy::lp::Relation;
use district_planner::profiles::Profiles;
use district_planner::scenario::{
    self, BATTERY, CHP, GAS_BOILER, HEAT_PUMP, HEAT_STORAGE, PV, SOLAR_THERMAL,
};

const HORIZON: usize = 48;

#[test]
fn every_bus_balances_at_every_step() {
    let (_, _, results, _) = solve_config(&short_preset("baseline", HORIZON));
    let violations = check_balance(&results, 1e-5);
    assert!(violations.is_empty(), "unbalanced: {violations:?}");
}

#[test]
fn storage_levels_stay_within_capacity_and_start_at_initial_level() {
    let mut config = short_preset("baseline", HORIZON);
    config.battery.initial_level = 0.5;
    config.heat_storage.min_kwh = 100.0;
    config.heat_storage.initial_level = 0.25;
    let (_, _, results, _) = solve_config(&config);

    for (label, initial) in [(BATTERY, 0.5), (HEAT_STORAGE, 0.25)] {
        let storage = results.storage(label).expect("storage present");
        assert!(storage.invested);
        assert_eq!(storage.levels.len(), HORIZON);
        for level in &storage.levels {
            assert!(*level >= -TOL, "{label} level {level} below zero");
            assert!(
                *level <= storage.capacity * (1.0 + TOL) + TOL,
                "{label} level {level} above capacity {}",
                storage.capacity
            );
        }
        assert_close(storage.levels[0], initial * storage.capacity, TOL, label);
    }
    assert!(results.storage(HEAT_STORAGE).map(|s| s.capacity).unwrap_or(0.0) >= 100.0 - TOL);
}

#[test]
fn investments_respect_configured_bounds() {
    let mut config = short_preset("baseline", HORIZON);
    config.gas_boiler.min_kw = 250.0;
    config.chp.max_kw = 50.0;
    let (_, _, results, _) = solve_config(&config);

    let boiler = size(&results, GAS_BOILER);
    assert!(boiler >= 250.0 - TOL, "boiler {boiler} below minimum");
    assert!(boiler <= config.gas_boiler.max_kw + TOL);
    let chp = size(&results, CHP);
    assert!((-TOL..=50.0 + TOL).contains(&chp), "chp {chp} outside [0, 50]");
    for label in [PV, SOLAR_THERMAL, HEAT_PUMP, BATTERY, HEAT_STORAGE] {
        assert!(size(&results, label) >= -TOL, "{label} negative");
    }
}

#[test]
fn collector_area_is_shared() {
    let mut config = short_preset("baseline", HORIZON);
    config.collectors.total_area_m2 = 50.0;
    config.pv.min_area_m2 = 20.0;
    config.solar_thermal.min_area_m2 = 25.0;
    let (_, _, results, kpis) = solve_config(&config);

    let used = size(&results, PV) / config.pv.area_yield
        + size(&results, SOLAR_THERMAL) / config.solar_thermal.area_yield;
    assert!(used <= 50.0 + TOL, "area used {used} exceeds 50");
    assert!(used >= 45.0 - TOL, "minimum areas not honored: {used}");
    let reported = kpis.value("area_pv").unwrap() + kpis.value("area_solar_thermal").unwrap();
    assert_close(reported, used, TOL, "reported area");
}

#[test]
fn total_cost_matches_the_objective() {
    let (_, _, results, kpis) = solve_config(&short_preset("baseline", HORIZON));
    let total = kpis.value("total_cost").expect("total cost defined");
    assert_close(total, results.objective(), 1e-5, "total cost");
}

#[test]
fn kpis_are_idempotent() {
    let (problem, _, results, kpis) = solve_config(&short_preset("all_electric", HORIZON));
    let again = KpiReport::from_results(&results, &problem.accounting);
    assert_eq!(kpis, again);
    assert_eq!(again, KpiReport::from_results(&results, &problem.accounting));
}

#[test]
fn absent_technologies_report_zero_size() {
    let (problem, lp, results, kpis) = solve_config(&short_preset("no_collectors", HORIZON));
    assert!(problem.system.find_component(PV).is_none());
    assert!(problem.system.is_omitted(PV));
    assert_eq!(results.investment(PV), Some(0.0));
    assert_eq!(results.investment(SOLAR_THERMAL), Some(0.0));
    assert_eq!(kpis.value("invest_pv"), Some(0.0));
    assert_eq!(kpis.value("area_solar_thermal"), Some(0.0));
    assert_eq!(lp.constraints_named("shared_").count(), 0);
}

#[test]
fn annuity_is_positive_and_falls_with_lifetime() {
    let capex = 1000.0;
    for rate in [0.0, 0.03, 0.05, 0.1] {
        let mut previous = f64::INFINITY;
        for lifetime in [1.0, 5.0, 10.0, 20.0, 40.0] {
            let a = annuity(capex, lifetime, rate).expect("valid parameters");
            assert!(a > 0.0);
            assert!(a < previous, "annuity must fall with lifetime at rate {rate}");
            previous = a;
        }
    }
    // one year at 5 %: the full capex plus one year of interest
    assert_close(annuity(capex, 1.0, 0.05).unwrap(), 1050.0, 1e-12, "one-year annuity");
    assert!(annuity(capex, 0.0, 0.05).is_err());
    assert!(annuity(capex, 10.0, -1.5).is_err());
}

/// The collector profile already contains the area yield and the area
/// constraint divides the investment by it again, so one m² of roof yields
/// `yield²` of fixed output per unit of irradiance. Pinned until the unit
/// convention is settled.
#[test]
fn area_yield_is_applied_in_profile_and_constraint() {
    let config = short_preset("baseline", 2);
    let profiles = Profiles {
        irradiance_wh_m2: vec![1000.0, 500.0],
        electricity_share: vec![1e-4; 2],
        heat_share: vec![1e-4; 2],
    };
    let problem = scenario::build(&config, &profiles).expect("topology should build");
    let (lp, index) = assemble(&problem.system, &problem.shared).expect("model should assemble");

    let pv = problem.system.find_component(PV).expect("pv present");
    let invest = index
        .component_investment(&problem.system, pv)
        .expect("pv is investable");

    let fixed: Vec<f64> = lp
        .constraints_named("fixed_pv_")
        .map(|c| {
            c.expr
                .terms
                .iter()
                .find(|(v, _)| *v == invest)
                .map(|(_, k)| -*k)
                .expect("profile term")
        })
        .collect();
    assert_eq!(fixed.len(), 2);
    assert_close(fixed[0], 1.0 * config.pv.area_yield, 1e-12, "profile t=0");
    assert_close(fixed[1], 0.5 * config.pv.area_yield, 1e-12, "profile t=1");

    let area = lp.constraints_named("shared_").next().expect("area row");
    assert_eq!(area.relation, Relation::Le);
    let coefficient = area
        .expr
        .terms
        .iter()
        .find(|(v, _)| *v == invest)
        .map(|(_, k)| *k)
        .expect("area term");
    assert_close(coefficient, 1.0 / config.pv.area_yield, 1e-12, "area coefficient");
}

#[test]
fn batch_scenarios_are_independent() {
    let configs = vec![short_preset("baseline", 24), short_preset("all_electric", 24)];
    let alone: Vec<f64> = configs
        .iter()
        .map(|c| solve_config(c).2.objective())
        .collect();
    let batch = district_planner::runner::run_batch(&configs, &district_planner::energy::solver::ClarabelSolver);
    for ((name, outcome), expected) in batch.iter().zip(alone) {
        let run = outcome.as_ref().expect("scenario should solve");
        assert_close(run.results.objective(), expected, 1e-6, name);
    }
}

#[test]
fn problem_build_is_deterministic() {
    let config = short_preset("baseline", 24);
    let a = build_problem(&config);
    let b = build_problem(&config);
    let (lp_a, _) = assemble(&a.system, &a.shared).expect("assemble");
    let (lp_b, _) = assemble(&b.system, &b.shared).expect("assemble");
    assert_eq!(lp_a.variables(), lp_b.variables());
    assert_eq!(lp_a.constraints(), lp_b.constraints());
    assert_eq!(lp_a.objective(), lp_b.objective());
}
