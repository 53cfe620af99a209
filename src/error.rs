//! Error taxonomy shared by model assembly, solving, and KPI evaluation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// A numeric input lies outside the domain of a costing formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Technical lifetime must be strictly positive and finite.
    #[error("lifetime must be > 0 years, got {0}")]
    NonPositiveLifetime(f64),
    /// Discount rates below -100 % have no financial meaning.
    #[error("discount rate must be >= -1, got {0}")]
    DiscountRateBelowMinusOne(f64),
}

/// Invalid topology or parameter detected before any solve attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A flow references a bus that was never added.
    #[error("component `{component}` references unknown bus #{bus}")]
    UnknownBus { component: String, bus: usize },
    /// A label lookup (e.g. a shared-resource member) failed.
    #[error("unknown component `{0}`")]
    UnknownComponent(String),
    /// No flow connects the two labels.
    #[error("no flow from `{from}` to `{to}`")]
    UnknownFlow { from: String, to: String },
    /// Bus and component labels share one namespace.
    #[error("label `{0}` is already registered")]
    DuplicateLabel(String),
    /// A bus without incident flows cannot be balanced meaningfully.
    #[error("bus `{0}` has no incident flows")]
    DanglingBus(String),
    /// Investment minimum exceeds its maximum.
    #[error("investment of `{label}`: minimum {minimum} exceeds maximum {maximum}")]
    InvestmentBounds {
        label: String,
        minimum: f64,
        maximum: f64,
    },
    /// An exogenous profile does not cover the horizon exactly.
    #[error("profile of `{label}` has {actual} values, horizon is {expected}")]
    ProfileLength {
        label: String,
        expected: usize,
        actual: usize,
    },
    /// A numeric attribute is out of range.
    #[error("`{label}`.{field}: {message}")]
    InvalidParameter {
        label: String,
        field: &'static str,
        message: String,
    },
    /// Annuity could not be computed for a technology.
    #[error("technology `{label}`: {source}")]
    Costing {
        label: String,
        #[source]
        source: DomainError,
    },
}

/// Non-optimal solver outcome; terminal for the scenario instance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveFailure {
    #[error("problem is infeasible")]
    Infeasible,
    #[error("problem is unbounded")]
    Unbounded,
    #[error("solver error: {0}")]
    Solver(String),
}

/// A ratio KPI is undefined for the solved system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KpiDomainError {
    #[error("no {carrier} demand over the horizon")]
    ZeroDemand { carrier: String },
    #[error("{storage} not installed")]
    NotInstalled { storage: String },
    #[error("undefined because {0} is undefined")]
    Dependent(String),
}

/// Failure to read or align an exogenous time series.
#[derive(Debug, Error)]
pub enum TimeSeriesError {
    #[error("cannot read time series `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("time series is missing column `{0}`")]
    MissingColumn(String),
    #[error("row {row}, column `{column}`: cannot parse `{value}` as a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },
    #[error("time series has {actual} rows, horizon needs {expected}")]
    TooShort { expected: usize, actual: usize },
}

/// Everything that can abort one scenario instance.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid configuration: {}", join_config_errors(.0))]
    InvalidConfig(Vec<ConfigError>),
    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesError),
    #[error("model assembly failed: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("solve failed: {0}")]
    Solve(#[from] SolveFailure),
    #[error("cannot write `{}`: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
