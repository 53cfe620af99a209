//! District planner entry point: CLI wiring, batch solve, and output.

use std::collections::HashSet;
use std::path::Path;
use std::process;

use tracing::{error, warn};

use district_planner::cli::{self, CliOptions};
use district_planner::config::ScenarioConfig;
use district_planner::energy::solver::default_solver;
use district_planner::io::export::write_outputs;
use district_planner::reporting::{print_batch_summary, print_scenario_report};
use district_planner::runner::run_batch;
use district_planner::telemetry::init_tracing;

/// Resolves presets and scenario files into configurations.
fn load_configs(opts: &CliOptions) -> Result<Vec<ScenarioConfig>, String> {
    let mut configs = Vec::with_capacity(opts.presets.len() + opts.scenarios.len());
    for name in &opts.presets {
        configs.push(ScenarioConfig::from_preset(name).map_err(|e| e.to_string())?);
    }
    for path in &opts.scenarios {
        configs.push(ScenarioConfig::from_toml_file(path).map_err(|e| e.to_string())?);
    }
    if let Some(seed) = opts.seed {
        for config in &mut configs {
            config.simulation.seed = seed;
        }
    }
    Ok(configs)
}

fn main() {
    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };
    if opts.help {
        cli::print_usage();
        return;
    }

    init_tracing(opts.log_json);

    let configs = match load_configs(&opts) {
        Ok(configs) => configs,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let mut seen = HashSet::new();
    for config in &configs {
        if !seen.insert(config.scenario.name.as_str()) {
            warn!(scenario = %config.scenario.name, "duplicate scenario name; later outputs overwrite earlier ones");
        }
    }

    let solver = default_solver();
    let outcomes = run_batch(&configs, solver.as_ref());

    let mut failed = false;
    for (name, outcome) in &outcomes {
        match outcome {
            Ok(run) => {
                let write_lp = opts.write_lp || run.config.simulation.write_lp;
                if let Err(e) = write_outputs(run, Path::new(&opts.out_dir), write_lp) {
                    error!(scenario = %name, error = %e, "writing outputs failed");
                    failed = true;
                }
                print_scenario_report(run);
            }
            Err(_) => failed = true,
        }
    }
    print_batch_summary(&outcomes);

    if failed {
        process::exit(1);
    }
}
