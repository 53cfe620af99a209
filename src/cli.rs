//! Command-line parsing for the planner binary.

use std::env;
use std::path::PathBuf;

/// Output directory used when `--out-dir` is not given.
pub const DEFAULT_OUT_DIR: &str = "output";

/// Preset used when neither `--scenario` nor `--preset` is given.
pub const DEFAULT_PRESET: &str = "baseline";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    /// Scenario TOML files, in the order given.
    pub scenarios: Vec<PathBuf>,
    /// Built-in presets, in the order given.
    pub presets: Vec<String>,
    pub out_dir: PathBuf,
    pub seed: Option<u64>,
    pub write_lp: bool,
    pub log_json: bool,
    pub help: bool,
}

/// Parses the process arguments.
///
/// # Errors
///
/// Returns a message describing the first invalid argument.
pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

/// Parses an argument list without the program name.
///
/// `--scenario` and `--preset` may be repeated and mixed; every occurrence
/// adds one scenario to the batch.
///
/// # Errors
///
/// Returns a message for unknown flags, missing values, or a malformed seed.
pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions {
        scenarios: Vec::new(),
        presets: Vec::new(),
        out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        seed: None,
        write_lp: false,
        log_json: false,
        help: false,
    };
    let mut out_dir_set = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --scenario (expected a TOML file path)")?;
                opts.scenarios.push(PathBuf::from(path));
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                opts.presets.push(name.to_string());
            }
            "--out-dir" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --out-dir (expected a directory)")?;
                if out_dir_set {
                    return Err("--out-dir provided more than once".to_string());
                }
                opts.out_dir = PathBuf::from(path);
                out_dir_set = true;
            }
            "--seed" => {
                i += 1;
                let value = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{value}\" is not a valid u64"))?;
                if opts.seed.replace(seed).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--write-lp" => opts.write_lp = true,
            "--log-json" => opts.log_json = true,
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenarios.is_empty() && opts.presets.is_empty() {
        opts.presets.push(DEFAULT_PRESET.to_string());
    }
    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index).map(String::as_str).ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("district-planner: multi-carrier district energy sizing and dispatch");
    eprintln!();
    eprintln!("Usage: district-planner [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>   Add a scenario from a TOML file (repeatable)");
    eprintln!("  --preset <name>     Add a built-in preset (repeatable)");
    eprintln!("  --out-dir <dir>     Output directory (default: {DEFAULT_OUT_DIR})");
    eprintln!("  --seed <u64>        Override the synthetic profile seed of every scenario");
    eprintln!("  --write-lp          Also write each model as CPLEX LP");
    eprintln!("  --log-json          Emit logs as JSON");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the {DEFAULT_PRESET} preset is used.");
}
