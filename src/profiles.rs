//! Exogenous per-timestep profiles: collector irradiance and demand shares.
//!
//! Profiles come either from a delimited CSV file or from a seeded synthetic
//! generator. Either way they are aligned 1:1 with the model's time index.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike, Timelike};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::TimeSeriesConfig;
use crate::energy::time_index::TimeIndex;
use crate::error::TimeSeriesError;

/// Hours in the reference year the demand shares are normalized to.
const HOURS_PER_YEAR: f64 = 8760.0;

/// Input profiles of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Profiles {
    /// Global irradiance per step in Wh/m².
    pub irradiance_wh_m2: Vec<f64>,
    /// Share of the annual electricity demand falling into each step.
    pub electricity_share: Vec<f64>,
    /// Share of the annual heat demand falling into each step.
    pub heat_share: Vec<f64>,
}

impl Profiles {
    pub fn len(&self) -> usize {
        self.irradiance_wh_m2.len()
    }

    pub fn is_empty(&self) -> bool {
        self.irradiance_wh_m2.is_empty()
    }

    /// Irradiance in kWh/m² per step.
    pub fn irradiance_kwh_m2(&self) -> Vec<f64> {
        self.irradiance_wh_m2.iter().map(|w| w * 0.001).collect()
    }

    /// Reads profiles from a delimited file, keeping the first `horizon` rows.
    ///
    /// # Errors
    ///
    /// Returns a `TimeSeriesError` if the file cannot be read, a configured
    /// column is missing, a cell is not a number, or the file has fewer than
    /// `horizon` rows.
    pub fn from_csv_path(
        path: &Path,
        columns: &TimeSeriesConfig,
        horizon: usize,
    ) -> Result<Self, TimeSeriesError> {
        let reader = csv_builder(columns)
            .from_path(path)
            .map_err(|source| TimeSeriesError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        read_table(reader, path, columns, horizon)
    }

    /// Same as [`from_csv_path`](Self::from_csv_path) for an in-memory reader.
    ///
    /// # Errors
    ///
    /// See [`from_csv_path`](Self::from_csv_path).
    pub fn from_reader(
        reader: impl Read,
        columns: &TimeSeriesConfig,
        horizon: usize,
    ) -> Result<Self, TimeSeriesError> {
        let reader = csv_builder(columns).from_reader(reader);
        read_table(reader, Path::new("<memory>"), columns, horizon)
    }

    /// Seeded synthetic profiles for the given time index.
    ///
    /// Irradiance follows a half-cosine day whose length and peak grow
    /// towards midsummer, damped by a random daily cloud factor. Electricity
    /// demand peaks in the evening; heat demand is dominated by winter.
    /// Both demand shares sum to 1 over a full hourly year.
    pub fn synthetic(time_index: &TimeIndex, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut irradiance = Vec::with_capacity(time_index.len());
        let mut electricity = Vec::with_capacity(time_index.len());
        let mut heat = Vec::with_capacity(time_index.len());

        let mut current_day = None;
        let mut cloud = 1.0;
        for ts in time_index.timestamps() {
            let day = ts.ordinal0();
            if current_day != Some(day) {
                current_day = Some(day);
                cloud = 1.0 - 0.7 * rng.random::<f64>();
            }
            let hour = f64::from(ts.hour()) + f64::from(ts.minute()) / 60.0;
            let summer = summer_factor(day);

            let half_day = 4.0 + 4.0 * summer;
            let from_noon = hour + 0.5 - 12.0;
            let peak = 150.0 + 650.0 * summer;
            let sun = if from_noon.abs() < half_day {
                peak * (std::f64::consts::FRAC_PI_2 * from_noon / half_day).cos()
            } else {
                0.0
            };
            irradiance.push((sun * cloud).max(0.0));

            let evening = (2.0 * std::f64::consts::PI * (hour - 13.0) / 24.0).sin();
            let el = 1.0 + 0.35 * evening + gaussian_noise(&mut rng, 0.05);
            electricity.push(el.max(0.05));

            let morning = (-(hour - 7.0).powi(2) / 8.0).exp();
            let th = (1.6 - 1.3 * summer) * (1.0 + 0.4 * morning) + gaussian_noise(&mut rng, 0.05);
            heat.push(th.max(0.05));
        }

        let step_hours = time_index.step_hours();
        normalize_shares(&mut electricity, step_hours);
        normalize_shares(&mut heat, step_hours);

        Self {
            irradiance_wh_m2: irradiance,
            electricity_share: electricity,
            heat_share: heat,
        }
    }
}

fn csv_builder(columns: &TimeSeriesConfig) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(columns.delimiter.bytes().next().unwrap_or(b';'))
        .trim(csv::Trim::All);
    builder
}

fn read_table<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
    columns: &TimeSeriesConfig,
    horizon: usize,
) -> Result<Profiles, TimeSeriesError> {
    let read_error = |source| TimeSeriesError::Read {
        path: path.to_path_buf(),
        source,
    };
    let headers = reader.headers().map_err(read_error)?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TimeSeriesError::MissingColumn(name.to_string()))
    };
    let wanted = [
        (columns.irradiance_column.as_str(), position(&columns.irradiance_column)?),
        (columns.electricity_column.as_str(), position(&columns.electricity_column)?),
        (columns.heat_column.as_str(), position(&columns.heat_column)?),
    ];

    let mut values: [Vec<f64>; 3] = Default::default();
    for (row, record) in reader.records().take(horizon).enumerate() {
        let record = record.map_err(read_error)?;
        for (slot, (name, idx)) in values.iter_mut().zip(wanted.iter()) {
            let cell = record.get(*idx).unwrap_or("");
            let value = cell.parse::<f64>().map_err(|_| TimeSeriesError::Parse {
                row: row + 1,
                column: (*name).to_string(),
                value: cell.to_string(),
            })?;
            slot.push(value);
        }
    }

    let rows = values[0].len();
    if rows < horizon {
        return Err(TimeSeriesError::TooShort {
            expected: horizon,
            actual: rows,
        });
    }
    let [irradiance_wh_m2, electricity_share, heat_share] = values;
    Ok(Profiles {
        irradiance_wh_m2,
        electricity_share,
        heat_share,
    })
}

/// 0 around the winter solstice, 1 around the summer solstice.
fn summer_factor(day_of_year: u32) -> f64 {
    let angle = 2.0 * std::f64::consts::PI * (f64::from(day_of_year) + 10.0) / 365.0;
    (1.0 - angle.cos()) / 2.0
}

/// Gaussian noise via Box-Muller.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos() * std_dev
}

/// Scales values so that each step carries `step_hours / 8760` on average.
fn normalize_shares(values: &mut [f64], step_hours: f64) {
    if values.is_empty() {
        return;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 {
        return;
    }
    let target = step_hours / HOURS_PER_YEAR;
    for v in values.iter_mut() {
        *v = *v / mean * target;
    }
}
