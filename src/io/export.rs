//! File exports for solved scenarios: KPI table, bus time series, JSON
//! results, and the per-scenario output directory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::lp_file::export_lp;
use crate::energy::kpi::{KpiReport, KpiValue};
use crate::energy::results::ResultSet;
use crate::energy::time_index::TimeIndex;
use crate::energy::windows::{BusSeries, SEASONS};
use crate::error::ScenarioError;
use crate::runner::ScenarioRun;

/// Column header of the KPI table.
const KPI_HEADER: [&str; 5] = ["key", "section", "unit", "value", "note"];

/// Timestamp format of the time-series exports.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Exports a KPI report to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_kpis_csv(report: &KpiReport, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_kpis_csv(report, BufWriter::new(file))
}

/// Writes one row per KPI. Undefined values leave `value` empty and carry
/// the reason in `note`.
///
/// # Arguments
///
/// * `report` - KPIs of one scenario
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_kpis_csv(report: &KpiReport, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(KPI_HEADER)?;

    for kpi in &report.kpis {
        let (value, note) = match &kpi.value {
            KpiValue::Value(v) => (format!("{v:.6}"), String::new()),
            KpiValue::Undefined(reason) => (String::new(), reason.to_string()),
        };
        wtr.write_record([
            kpi.key.as_str(),
            kpi.section.to_string().as_str(),
            kpi.unit,
            value.as_str(),
            note.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a bus series to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_series_csv(series: &BusSeries, time_index: &TimeIndex, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_series_csv(series, time_index, BufWriter::new(file))
}

/// Writes a bus series with a leading timestamp column and one signed
/// column per flow, named as in [`BusSeries::columns`].
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_series_csv(series: &BusSeries, time_index: &TimeIndex, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec!["timestamp".to_string()];
    header.extend(series.columns.iter().map(|(label, _)| label.clone()));
    wtr.write_record(&header)?;

    for (row, t) in series.range.clone().enumerate() {
        let timestamp = time_index
            .timestamp(t)
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| t.to_string());
        let mut record = vec![timestamp];
        record.extend(series.columns.iter().map(|(_, values)| format!("{:.4}", values[row])));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    scenario: &'a str,
    results: &'a ResultSet,
    kpis: &'a KpiReport,
}

/// Writes results and KPIs of one scenario as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if writing or serialization fails.
pub fn write_results_json(
    scenario: &str,
    results: &ResultSet,
    kpis: &KpiReport,
    mut writer: impl Write,
) -> io::Result<()> {
    let document = ResultsDocument {
        scenario,
        results,
        kpis,
    };
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writeln!(writer)?;
    writer.flush()
}

/// Writes every output of a solved scenario into `out_dir/<scenario name>/`.
///
/// The directory receives `config.toml`, `kpis.csv`, `results.json`, one
/// `timeseries_<bus>.csv` per bus, one `timeseries_<bus>_<season>.csv` per
/// seasonal window inside the horizon, and `model.lp` if `write_lp` is set.
///
/// # Errors
///
/// Returns `ScenarioError::Output` naming the file that could not be written.
pub fn write_outputs(run: &ScenarioRun, out_dir: &Path, write_lp: bool) -> Result<PathBuf, ScenarioError> {
    let dir = out_dir.join(&run.name);
    fs::create_dir_all(&dir).map_err(output_error(&dir))?;

    let path = dir.join("config.toml");
    let toml = run
        .config
        .to_toml_string()
        .map_err(|e| io::Error::other(e.to_string()))
        .map_err(output_error(&path))?;
    fs::write(&path, toml).map_err(output_error(&path))?;

    let path = dir.join("kpis.csv");
    export_kpis_csv(&run.kpis, &path).map_err(output_error(&path))?;

    let path = dir.join("results.json");
    File::create(&path)
        .and_then(|file| write_results_json(&run.name, &run.results, &run.kpis, BufWriter::new(file)))
        .map_err(output_error(&path))?;

    let time_index = run.results.time_index();
    for (bus, label) in run.results.buses() {
        let path = dir.join(format!("timeseries_{label}.csv"));
        export_series_csv(&BusSeries::full(&run.results, bus), time_index, &path)
            .map_err(output_error(&path))?;

        for window in &SEASONS {
            let Some(series) = BusSeries::seasonal(&run.results, bus, window) else {
                debug!(bus = %label, season = window.name, "season outside horizon");
                continue;
            };
            let path = dir.join(format!("timeseries_{label}_{}.csv", window.name));
            export_series_csv(&series, time_index, &path).map_err(output_error(&path))?;
        }
    }

    if write_lp {
        let path = dir.join("model.lp");
        export_lp(&run.model, &path).map_err(output_error(&path))?;
    }

    info!(scenario = %run.name, dir = %dir.display(), "outputs written");
    Ok(dir)
}

fn output_error(path: &Path) -> impl FnOnce(io::Error) -> ScenarioError + '_ {
    move |source| ScenarioError::Output {
        path: path.to_path_buf(),
        source,
    }
}
