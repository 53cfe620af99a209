//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format of `simulation.start`.
pub const START_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub scenario: ScenarioMeta,
    /// Horizon, timing, and input/output switches.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Column layout of the time-series CSV.
    #[serde(default)]
    pub timeseries: TimeSeriesConfig,
    #[serde(default)]
    pub economics: EconomicsConfig,
    /// Variable costs per purchased kWh.
    #[serde(default)]
    pub prices: PriceConfig,
    /// Emission factors per consumed kWh.
    #[serde(default)]
    pub emissions: EmissionConfig,
    /// Annual demand totals.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Shared roof/ground area for PV and solar thermal.
    #[serde(default)]
    pub collectors: CollectorAreaConfig,
    #[serde(default = "CollectorConfig::pv")]
    pub pv: CollectorConfig,
    #[serde(default = "CollectorConfig::solar_thermal")]
    pub solar_thermal: CollectorConfig,
    #[serde(default)]
    pub gas_boiler: BoilerConfig,
    #[serde(default)]
    pub chp: ChpConfig,
    #[serde(default)]
    pub heat_pump: HeatPumpConfig,
    #[serde(default = "StorageConfig::battery")]
    pub battery: StorageConfig,
    #[serde(default = "StorageConfig::heat_storage")]
    pub heat_storage: StorageConfig,
}

/// Scenario identification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioMeta {
    /// Name used for the output directory and report headings.
    pub name: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            name: "baseline".to_string(),
        }
    }
}

/// Horizon, timing, and input/output switches.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of timesteps (must be > 0).
    pub horizon: usize,
    /// First timestamp, `YYYY-MM-DDTHH:MM:SS`.
    pub start: String,
    /// Timestep length in minutes (must be > 0).
    pub step_minutes: u32,
    /// Seed for synthetic profiles.
    pub seed: u64,
    /// Time-series CSV; synthetic profiles are used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeseries_file: Option<PathBuf>,
    /// Write the assembled model as a CPLEX LP file.
    pub write_lp: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon: 8760,
            start: "2019-01-01T00:00:00".to_string(),
            step_minutes: 60,
            seed: 42,
            timeseries_file: None,
            write_lp: false,
        }
    }
}

impl SimulationConfig {
    /// Parsed `start`, `None` if malformed.
    pub fn start_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.start, START_FORMAT).ok()
    }
}

/// Column layout of the time-series CSV.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeSeriesConfig {
    /// Global irradiance in Wh/m² per step.
    pub irradiance_column: String,
    /// Electricity demand share per step (sums to 1 over a year).
    pub electricity_column: String,
    /// Heat demand share per step (sums to 1 over a year).
    pub heat_column: String,
    /// Single-character field delimiter.
    pub delimiter: String,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            irradiance_column: "Sol_irradiation [Wh/sqm]".to_string(),
            electricity_column: "P*".to_string(),
            heat_column: "Q*".to_string(),
            delimiter: ";".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EconomicsConfig {
    /// Weighted average cost of capital used for every annuity.
    pub wacc: f64,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self { wacc: 0.05 }
    }
}

/// Variable costs in €/kWh.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceConfig {
    pub gas: f64,
    /// CO₂ certificate cost per kWh of gas.
    pub co2: f64,
    pub electricity: f64,
    pub heat: f64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            gas: 0.04,
            co2: 0.006,
            electricity: 0.25,
            heat: 0.09,
        }
    }
}

/// Emission factors in g CO₂ per kWh.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmissionConfig {
    pub gas: f64,
    pub electricity: f64,
    pub heat: f64,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            gas: 202.0,
            electricity: 401.0,
            heat: 280.0,
        }
    }
}

/// Annual demand totals in kWh.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    pub electricity_kwh: f64,
    pub heat_kwh: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            electricity_kwh: 1_500_000.0,
            heat_kwh: 4_000_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorAreaConfig {
    /// Area shared by PV and solar thermal; 0 omits both.
    pub total_area_m2: f64,
}

impl Default for CollectorAreaConfig {
    fn default() -> Self {
        Self {
            total_area_m2: 8000.0,
        }
    }
}

/// PV or solar-thermal collector field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    /// Capital cost per installed unit (€).
    pub capex: f64,
    /// Technical lifetime (years).
    pub lifetime: f64,
    /// Installed units per m² of collector area.
    pub area_yield: f64,
    /// Smallest area to install (m²).
    #[serde(default)]
    pub min_area_m2: f64,
}

impl CollectorConfig {
    pub fn pv() -> Self {
        Self {
            capex: 1100.0,
            lifetime: 25.0,
            area_yield: 0.2,
            min_area_m2: 0.0,
        }
    }

    pub fn solar_thermal() -> Self {
        Self {
            capex: 600.0,
            lifetime: 20.0,
            area_yield: 0.5,
            min_area_m2: 0.0,
        }
    }
}

/// Gas boiler sized on its heat output.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoilerConfig {
    pub capex: f64,
    pub lifetime: f64,
    pub min_kw: f64,
    /// 0 omits the boiler.
    pub max_kw: f64,
    /// Heat out per gas in.
    pub efficiency: f64,
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self {
            capex: 120.0,
            lifetime: 20.0,
            min_kw: 0.0,
            max_kw: 3000.0,
            efficiency: 0.95,
        }
    }
}

/// Combined heat and power unit sized on its heat output.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChpConfig {
    pub capex: f64,
    pub lifetime: f64,
    pub min_kw: f64,
    /// 0 omits the CHP.
    pub max_kw: f64,
    /// Electricity out per gas in.
    pub electrical_efficiency: f64,
    /// Electricity plus heat out per gas in.
    pub total_efficiency: f64,
}

impl Default for ChpConfig {
    fn default() -> Self {
        Self {
            capex: 1500.0,
            lifetime: 15.0,
            min_kw: 0.0,
            max_kw: 800.0,
            electrical_efficiency: 0.35,
            total_efficiency: 0.85,
        }
    }
}

/// Electric heat pump sized on its heat output.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeatPumpConfig {
    pub capex: f64,
    pub lifetime: f64,
    pub min_kw: f64,
    /// 0 omits the heat pump.
    pub max_kw: f64,
    /// Heat out per electricity in.
    pub cop: f64,
}

impl Default for HeatPumpConfig {
    fn default() -> Self {
        Self {
            capex: 900.0,
            lifetime: 20.0,
            min_kw: 0.0,
            max_kw: 1500.0,
            cop: 3.2,
        }
    }
}

/// Battery or thermal storage sized on its energy content.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Capital cost per kWh of capacity (€).
    pub capex: f64,
    pub lifetime: f64,
    #[serde(default)]
    pub min_kwh: f64,
    /// 0 omits the storage.
    pub max_kwh: f64,
    /// Fraction of the content lost per step.
    pub loss_rate: f64,
    /// Content at the first step as a fraction of capacity.
    #[serde(default)]
    pub initial_level: f64,
    pub charge_efficiency: f64,
    pub discharge_efficiency: f64,
    /// Require the final level to equal the initial one.
    #[serde(default)]
    pub balanced: bool,
}

impl StorageConfig {
    pub fn battery() -> Self {
        Self {
            capex: 700.0,
            lifetime: 12.0,
            min_kwh: 0.0,
            max_kwh: 2000.0,
            loss_rate: 0.0001,
            initial_level: 0.0,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            balanced: false,
        }
    }

    pub fn heat_storage() -> Self {
        Self {
            capex: 40.0,
            lifetime: 25.0,
            min_kwh: 0.0,
            max_kwh: 20000.0,
            loss_rate: 0.005,
            initial_level: 0.0,
            charge_efficiency: 0.98,
            discharge_efficiency: 0.98,
            balanced: false,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.horizon"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline district: every technology available.
    pub fn baseline() -> Self {
        Self {
            scenario: ScenarioMeta::default(),
            simulation: SimulationConfig::default(),
            timeseries: TimeSeriesConfig::default(),
            economics: EconomicsConfig::default(),
            prices: PriceConfig::default(),
            emissions: EmissionConfig::default(),
            demand: DemandConfig::default(),
            collectors: CollectorAreaConfig::default(),
            pv: CollectorConfig::pv(),
            solar_thermal: CollectorConfig::solar_thermal(),
            gas_boiler: BoilerConfig::default(),
            chp: ChpConfig::default(),
            heat_pump: HeatPumpConfig::default(),
            battery: StorageConfig::battery(),
            heat_storage: StorageConfig::heat_storage(),
        }
    }

    /// Returns the no-collectors preset: no roof area, so neither PV nor
    /// solar thermal exists.
    pub fn no_collectors() -> Self {
        Self {
            scenario: ScenarioMeta {
                name: "no_collectors".to_string(),
            },
            collectors: CollectorAreaConfig { total_area_m2: 0.0 },
            ..Self::baseline()
        }
    }

    /// Returns the all-electric preset: no gas conversion, larger heat pump
    /// and thermal storage.
    pub fn all_electric() -> Self {
        let base = Self::baseline();
        Self {
            scenario: ScenarioMeta {
                name: "all_electric".to_string(),
            },
            gas_boiler: BoilerConfig {
                max_kw: 0.0,
                ..base.gas_boiler.clone()
            },
            chp: ChpConfig {
                max_kw: 0.0,
                ..base.chp.clone()
            },
            heat_pump: HeatPumpConfig {
                max_kw: 3000.0,
                ..base.heat_pump.clone()
            },
            heat_storage: StorageConfig {
                max_kwh: 40000.0,
                ..base.heat_storage.clone()
            },
            ..base
        }
    }

    /// Returns the debug preset: three timesteps and an LP dump.
    pub fn debug() -> Self {
        Self {
            scenario: ScenarioMeta {
                name: "debug".to_string(),
            },
            simulation: SimulationConfig {
                horizon: 3,
                write_lp: true,
                ..SimulationConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "no_collectors", "all_electric", "debug"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "no_collectors" => Ok(Self::no_collectors()),
            "all_electric" => Ok(Self::all_electric()),
            "debug" => Ok(Self::debug()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Serializes the resolved configuration back to TOML.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.scenario.name.trim().is_empty() {
            errors.push(ConfigError::new("scenario.name", "must not be empty"));
        }

        let s = &self.simulation;
        if s.horizon == 0 {
            errors.push(ConfigError::new("simulation.horizon", "must be > 0"));
        }
        if s.step_minutes == 0 {
            errors.push(ConfigError::new("simulation.step_minutes", "must be > 0"));
        }
        if s.start_datetime().is_none() {
            errors.push(ConfigError::new(
                "simulation.start",
                format!("must match {START_FORMAT}, got \"{}\"", s.start),
            ));
        }
        if self.timeseries.delimiter.len() != 1 {
            errors.push(ConfigError::new(
                "timeseries.delimiter",
                "must be a single ASCII character",
            ));
        }

        if !self.economics.wacc.is_finite() || self.economics.wacc < -1.0 {
            errors.push(ConfigError::new("economics.wacc", "must be >= -1"));
        }

        let p = &self.prices;
        for (name, value) in [
            ("gas", p.gas),
            ("co2", p.co2),
            ("electricity", p.electricity),
            ("heat", p.heat),
        ] {
            if !value.is_finite() {
                errors.push(ConfigError::new(format!("prices.{name}"), "must be finite"));
            }
        }
        let e = &self.emissions;
        for (name, value) in [("gas", e.gas), ("electricity", e.electricity), ("heat", e.heat)] {
            non_negative(&mut errors, &format!("emissions.{name}"), value);
        }
        non_negative(&mut errors, "demand.electricity_kwh", self.demand.electricity_kwh);
        non_negative(&mut errors, "demand.heat_kwh", self.demand.heat_kwh);
        non_negative(&mut errors, "collectors.total_area_m2", self.collectors.total_area_m2);

        for (name, c) in [("pv", &self.pv), ("solar_thermal", &self.solar_thermal)] {
            positive_lifetime(&mut errors, name, c.lifetime);
            if !(c.area_yield.is_finite() && c.area_yield > 0.0) {
                errors.push(ConfigError::new(format!("{name}.area_yield"), "must be > 0"));
            }
            non_negative(&mut errors, &format!("{name}.min_area_m2"), c.min_area_m2);
        }
        let area = self.collectors.total_area_m2;
        if area > 0.0 && self.pv.min_area_m2 + self.solar_thermal.min_area_m2 > area {
            errors.push(ConfigError::new(
                "pv.min_area_m2",
                "minimum collector areas exceed collectors.total_area_m2",
            ));
        }

        let b = &self.gas_boiler;
        positive_lifetime(&mut errors, "gas_boiler", b.lifetime);
        size_range(&mut errors, "gas_boiler", "kw", b.min_kw, b.max_kw);
        efficiency(&mut errors, "gas_boiler.efficiency", b.efficiency);

        let c = &self.chp;
        positive_lifetime(&mut errors, "chp", c.lifetime);
        size_range(&mut errors, "chp", "kw", c.min_kw, c.max_kw);
        efficiency(&mut errors, "chp.electrical_efficiency", c.electrical_efficiency);
        efficiency(&mut errors, "chp.total_efficiency", c.total_efficiency);
        if c.total_efficiency <= c.electrical_efficiency {
            errors.push(ConfigError::new(
                "chp.total_efficiency",
                "must be > chp.electrical_efficiency",
            ));
        }

        let h = &self.heat_pump;
        positive_lifetime(&mut errors, "heat_pump", h.lifetime);
        size_range(&mut errors, "heat_pump", "kw", h.min_kw, h.max_kw);
        if !(h.cop.is_finite() && h.cop > 0.0) {
            errors.push(ConfigError::new("heat_pump.cop", "must be > 0"));
        }

        for (name, st) in [("battery", &self.battery), ("heat_storage", &self.heat_storage)] {
            positive_lifetime(&mut errors, name, st.lifetime);
            size_range(&mut errors, name, "kwh", st.min_kwh, st.max_kwh);
            fraction(&mut errors, &format!("{name}.loss_rate"), st.loss_rate);
            fraction(&mut errors, &format!("{name}.initial_level"), st.initial_level);
            efficiency(&mut errors, &format!("{name}.charge_efficiency"), st.charge_efficiency);
            efficiency(&mut errors, &format!("{name}.discharge_efficiency"), st.discharge_efficiency);
        }

        errors
    }
}

fn non_negative(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ConfigError::new(field, "must be >= 0"));
    }
}

fn positive_lifetime(errors: &mut Vec<ConfigError>, section: &str, lifetime: f64) {
    if !(lifetime.is_finite() && lifetime > 0.0) {
        errors.push(ConfigError::new(format!("{section}.lifetime"), "must be > 0"));
    }
}

fn size_range(errors: &mut Vec<ConfigError>, section: &str, unit: &str, min: f64, max: f64) {
    non_negative(errors, &format!("{section}.min_{unit}"), min);
    non_negative(errors, &format!("{section}.max_{unit}"), max);
    if max > 0.0 && min > max {
        errors.push(ConfigError::new(
            format!("{section}.min_{unit}"),
            format!("must be <= {section}.max_{unit}"),
        ));
    }
}

fn efficiency(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value > 0.0 && value <= 1.0) {
        errors.push(ConfigError::new(field, "must be in (0.0, 1.0]"));
    }
}

fn fraction(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn preset_names_match_scenario_names() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).ok();
            assert_eq!(cfg.map(|c| c.scenario.name).as_deref(), Some(*name));
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[scenario]
name = "team_3"

[simulation]
horizon = 168
seed = 7
timeseries_file = "data/district.csv"

[economics]
wacc = 0.03

[collectors]
total_area_m2 = 2500.0

[pv]
capex = 950.0
lifetime = 25.0
area_yield = 0.21

[chp]
max_kw = 0.0

[battery]
capex = 500.0
lifetime = 15.0
max_kwh = 400.0
loss_rate = 0.0
charge_efficiency = 0.9
discharge_efficiency = 0.9
balanced = true
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.horizon), Some(168));
        assert_eq!(cfg.as_ref().map(|c| c.scenario.name.as_str()), Some("team_3"));
        assert_eq!(cfg.as_ref().map(|c| c.pv.min_area_m2), Some(0.0));
        assert_eq!(cfg.as_ref().map(|c| c.battery.balanced), Some(true));
        // untouched sections keep their defaults
        assert_eq!(
            cfg.as_ref().map(|c| c.solar_thermal.clone()),
            Some(CollectorConfig::solar_thermal())
        );
        assert!(cfg.map(|c| c.validate().is_empty()).unwrap_or(false));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
horizon = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_collector_section_requires_core_fields() {
        let toml = r#"
[pv]
capex = 950.0
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_zero_horizon() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.horizon = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.horizon"));
    }

    #[test]
    fn validation_catches_bad_start() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.start = "yesterday".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.start"));
    }

    #[test]
    fn validation_catches_non_positive_lifetime() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.heat_pump.lifetime = 0.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "heat_pump.lifetime"));
    }

    #[test]
    fn validation_catches_min_above_max() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.min_kwh = 5000.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery.min_kwh"));
    }

    #[test]
    fn omitted_technology_ignores_minimum() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.chp.max_kw = 0.0;
        cfg.chp.min_kw = 100.0;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validation_catches_chp_efficiencies() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.chp.electrical_efficiency = 0.9;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "chp.total_efficiency"));
    }

    #[test]
    fn validation_catches_collector_minimums() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.collectors.total_area_m2 = 100.0;
        cfg.pv.min_area_m2 = 80.0;
        cfg.solar_thermal.min_area_m2 = 40.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "pv.min_area_m2"));
    }

    #[test]
    fn toml_round_trip_of_preset() {
        let cfg = ScenarioConfig::all_electric();
        let text = cfg.to_toml_string().unwrap();
        let back = ScenarioConfig::from_toml_str(&text).ok();
        assert_eq!(back, Some(cfg));
    }

    #[test]
    fn all_electric_has_no_gas_conversion() {
        let cfg = ScenarioConfig::all_electric();
        assert_eq!(cfg.gas_boiler.max_kw, 0.0);
        assert_eq!(cfg.chp.max_kw, 0.0);
        assert!(cfg.heat_pump.max_kw > ScenarioConfig::baseline().heat_pump.max_kw);
    }
}
