use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use argus_explore::{
    enumerate, BranchCoverage, ConstraintModel, CoverageStrategy, ModelError, PathCoverage,
    RunLimits, TestCase, ValueRange,
};
use argus_ir::parse_script;
use argus_smt::Z3Session;

mod export;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Coverage-driven test case generation from instrumented constraint encodings"
)]
struct Cli {
    /// SMT-LIB constraint file produced by the instrumenter
    input: PathBuf,

    /// Coverage criterion
    #[arg(value_enum)]
    criterion: Criterion,

    /// Lower bound applied to every integer input variable
    #[arg(long, requires = "max")]
    min: Option<i64>,

    /// Upper bound applied to every integer input variable
    #[arg(long, requires = "min")]
    max: Option<i64>,

    /// Write the suite to a file instead of stdout
    #[arg(long)]
    export: bool,

    /// Export destination (default: output/<input stem>.<format>)
    #[arg(long, requires = "export")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    format: Format,

    /// Column delimiter for csv output
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Stop after this many enumeration iterations (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_iterations: u64,

    /// Stop after this many wall-clock seconds (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_wall_secs: u64,

    /// Per-query solver timeout in milliseconds
    #[arg(long)]
    solver_timeout_ms: Option<u64>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Criterion {
    Branch,
    Path,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .ok();

    match run(&cli) {
        Ok(code) => code,
        Err(message) => {
            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, String> {
    let text = fs::read_to_string(&cli.input)
        .map_err(|e| format!("cannot read {}: {e}", cli.input.display()))?;
    let script =
        parse_script(&text).map_err(|e| format!("{}: {e}", cli.input.display()))?;

    let range = match (cli.min, cli.max) {
        (Some(min), Some(max)) => Some(ValueRange::new(min, max).map_err(|e| e.to_string())?),
        _ => None,
    };

    let model = match ConstraintModel::new(script, range) {
        Ok(model) => model,
        // No input variables means there is nothing to generate values for;
        // an empty suite is the answer, not a failure.
        Err(ModelError::NoInputVariables) => {
            log::warn!("no input variables declared; emitting an empty suite");
            emit(cli, &[])?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(format!("preprocessing failed: {e}")),
    };

    let strategy: &dyn CoverageStrategy = match cli.criterion {
        Criterion::Branch => &BranchCoverage,
        Criterion::Path => &PathCoverage,
    };
    log::info!(
        "{} input variables, {} constraints, {} coverage",
        model.input_variables().len(),
        model.constraints().len(),
        strategy.name()
    );

    let mut session = match cli.solver_timeout_ms {
        Some(timeout) => Z3Session::with_timeout_ms(timeout),
        None => Z3Session::new(),
    };
    let limits = RunLimits {
        max_iterations: cli.max_iterations,
        max_wall_secs: cli.max_wall_secs,
    };

    match enumerate(&model, strategy, &mut session, &limits, None) {
        Ok(outcome) => {
            log::info!(
                "{} test cases in {} iterations ({:?})",
                outcome.cases.len(),
                outcome.iterations,
                outcome.stop
            );
            emit(cli, &outcome.cases)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            log::error!("{err}");
            // Every case appended before the failure was independently
            // verified satisfiable; flush them before reporting.
            if !err.completed().is_empty() {
                log::warn!("flushing {} completed test cases", err.completed().len());
                emit(cli, err.completed())?;
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn emit(cli: &Cli, cases: &[TestCase]) -> Result<(), String> {
    let rendered = match cli.format {
        Format::Csv => export::render_rows(cases, cli.delimiter),
        Format::Json => {
            let mut text = serde_json::to_string_pretty(cases)
                .map_err(|e| format!("json encoding failed: {e}"))?;
            text.push('\n');
            text
        }
    };

    if cli.export {
        let extension = match cli.format {
            Format::Csv => "csv",
            Format::Json => "json",
        };
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| export::derived_output_path(&cli.input, extension));
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
            }
        }
        fs::write(&path, rendered)
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        log::info!("wrote {}", path.display());
    } else {
        print!("{rendered}");
    }
    Ok(())
}
