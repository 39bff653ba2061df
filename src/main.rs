//! Binary entry point for the codescope CLI.
//!
//! Each stage is available as its own subcommand, exchanging JSON so stages
//! can be chained by hand; `run` drives the whole pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Collect and analyze a project
//! codescope collect my_project
//! codescope analyze my_project > analysis.json
//!
//! # Generate, run and report step by step
//! codescope generate --analysis analysis.json --output-dir out/tests
//! codescope test out/tests > execution.json
//! codescope report --analysis analysis.json --execution execution.json
//!
//! # Everything at once
//! codescope run my_project
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use codescope::config::Config;
use codescope::error::{CodescopeError, OutputErrorCode};
use codescope::execution::ExecutionReport;
use codescope::output::{emit_response, emit_response_compact, ErrorResponse, StageResponse};
use codescope::pipeline::{run_in_background, PipelineOptions};
use codescope::runner::CommandExecutor;
use codescope::toolkit::{decode_analysis, decode_execution, Operation, Toolkit};

// ============================================================================
// CLI Structure
// ============================================================================

/// Analyze Python projects, generate tests, and create documentation.
#[derive(Parser, Debug)]
#[command(name = "codescope", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Configuration file (default: codescope.toml in the project root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Print JSON on a single line.
    #[arg(long, global = true)]
    compact: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Collect every Python file under a project directory.
    Collect {
        /// Project root.
        root: PathBuf,
    },
    /// Analyze a Python file, or every Python file under a directory.
    Analyze {
        /// File or project root.
        path: PathBuf,
    },
    /// Generate pytest skeletons from analysis records.
    Generate {
        /// Analysis JSON file (`-` for stdin).
        #[arg(long)]
        analysis: PathBuf,
        /// Directory for the generated tests (default: from config).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the tests in a directory and parse the results.
    Test {
        /// Directory holding `test_*.py` files.
        test_dir: PathBuf,
        /// Run the tests from this directory.
        #[arg(long)]
        project_root: Option<PathBuf>,
        /// Python interpreter (default: python3 or python on PATH).
        #[arg(long)]
        python: Option<String>,
        /// Kill the runner after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Assemble the Markdown report.
    Report {
        /// Analysis JSON file (`-` for stdin).
        #[arg(long)]
        analysis: PathBuf,
        /// Execution report JSON file.
        #[arg(long)]
        execution: PathBuf,
        /// Report path (default: from config).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the full pipeline over a project.
    Run {
        /// Project root.
        root: PathBuf,
        /// Directory for the generated tests (default: from config).
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Report path (default: from config).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Python interpreter (default: python3 or python on PATH).
        #[arg(long)]
        python: Option<String>,
    },
}

/// Summary printed by `run`.
#[derive(Debug, Serialize)]
struct RunSummary {
    files_collected: usize,
    modules_analyzed: usize,
    modules_failed: usize,
    generated_test_files: Vec<String>,
    execution: ExecutionReport,
    report_path: Option<String>,
    message: String,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::new(&err);

            // Errors go to stdout as JSON, same as results
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), CodescopeError> {
    let global = &cli.global;
    match cli.command {
        Command::Collect { root } => execute_collect(global, &root),
        Command::Analyze { path } => execute_analyze(global, &path),
        Command::Generate {
            analysis,
            output_dir,
        } => execute_generate(global, &analysis, output_dir),
        Command::Test {
            test_dir,
            project_root,
            python,
            timeout,
        } => execute_test(global, &test_dir, project_root, python, timeout),
        Command::Report {
            analysis,
            execution,
            output,
        } => execute_report(global, &analysis, &execution, output),
        Command::Run {
            root,
            output_dir,
            report,
            python,
        } => execute_run(global, &root, output_dir, report, python),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_collect(global: &GlobalArgs, root: &Path) -> Result<(), CodescopeError> {
    let toolkit = Toolkit::with_command_executor(load_config(global, root)?);
    let collection = toolkit.collect(root)?;
    emit(global, &StageResponse::new(Operation::CollectFiles.name(), collection))
}

fn execute_analyze(global: &GlobalArgs, path: &Path) -> Result<(), CodescopeError> {
    if path.is_file() {
        let toolkit = Toolkit::with_command_executor(load_config(global, Path::new("."))?);
        let source = read_input(path)?;
        let logical = path.to_string_lossy().replace('\\', "/");
        let analysis = toolkit.analyze_source(&source, &logical);
        return emit(global, &StageResponse::new(Operation::AnalyzeCode.name(), analysis));
    }

    let toolkit = Toolkit::with_command_executor(load_config(global, path)?);
    let collection = toolkit.collect(path)?;
    let analyses = toolkit.analyze(&collection);
    emit(global, &StageResponse::new(Operation::AnalyzeCode.name(), analyses))
}

fn execute_generate(
    global: &GlobalArgs,
    analysis: &Path,
    output_dir: Option<PathBuf>,
) -> Result<(), CodescopeError> {
    let toolkit = Toolkit::with_command_executor(load_config(global, Path::new("."))?);
    let out_dir = output_dir.unwrap_or_else(|| toolkit.config().generate.output_dir.clone());
    let json = read_input(analysis)?;
    let manifest = toolkit.generate_from_json(&json, &out_dir)?;
    emit(global, &StageResponse::new(Operation::GenerateTests.name(), manifest))
}

fn execute_test(
    global: &GlobalArgs,
    test_dir: &Path,
    project_root: Option<PathBuf>,
    python: Option<String>,
    timeout: Option<u64>,
) -> Result<(), CodescopeError> {
    let root = project_root.unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(global, &root)?;
    let mut executor = CommandExecutor::from_config(&config.run).with_working_dir(&root);
    if let Some(python) = python {
        executor = executor.with_python(python);
    }
    if let Some(secs) = timeout {
        executor = executor.with_timeout(Duration::from_secs(secs));
    }
    let toolkit = Toolkit::new(config, executor);
    let report = toolkit.run_tests(test_dir)?;
    emit(global, &StageResponse::new(Operation::RunTests.name(), report))
}

fn execute_report(
    global: &GlobalArgs,
    analysis: &Path,
    execution: &Path,
    output: Option<PathBuf>,
) -> Result<(), CodescopeError> {
    if is_stdin(analysis) && is_stdin(execution) {
        return Err(CodescopeError::invalid_args(
            "--analysis and --execution cannot both read stdin",
        ));
    }
    let toolkit = Toolkit::with_command_executor(load_config(global, Path::new("."))?);
    let modules = decode_analysis(&read_input(analysis)?)?;
    let execution = decode_execution(&read_input(execution)?)?;
    let output = output.unwrap_or_else(|| toolkit.config().report.output_path.clone());

    let status = toolkit.report(&modules, &execution, &output, now());
    if !status.is_success() {
        return Err(CodescopeError::io_at(output.display().to_string(), status.message));
    }
    emit(global, &StageResponse::new(Operation::GenerateReport.name(), status))
}

fn execute_run(
    global: &GlobalArgs,
    root: &Path,
    output_dir: Option<PathBuf>,
    report: Option<PathBuf>,
    python: Option<String>,
) -> Result<(), CodescopeError> {
    let config = load_config(global, root)?;
    let options = PipelineOptions {
        project_root: root.to_path_buf(),
        tests_dir: output_dir.unwrap_or_else(|| config.generate.output_dir.clone()),
        report_path: report.unwrap_or_else(|| config.report.output_path.clone()),
    };
    let mut executor = CommandExecutor::from_config(&config.run).with_working_dir(root);
    if let Some(python) = python {
        executor = executor.with_python(python);
    }
    let toolkit = Toolkit::new(config, executor);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CodescopeError::internal(format!("cannot start runtime: {}", e)))?;
    let outcome = runtime.block_on(run_in_background(toolkit, options, now()))?;

    let modules_analyzed = outcome.analyzed_count();
    let summary = RunSummary {
        files_collected: outcome.files_collected,
        modules_analyzed,
        modules_failed: outcome.analyses.len() - modules_analyzed,
        generated_test_files: outcome.manifest.generated_test_files,
        execution: outcome.execution,
        report_path: outcome.report.output_path,
        message: outcome.report.message,
    };
    emit(global, &StageResponse::new("run", summary))
}

// ============================================================================
// Helpers
// ============================================================================

/// Explicit `--config`, else `codescope.toml` under `project_root`.
fn load_config(global: &GlobalArgs, project_root: &Path) -> Result<Config, CodescopeError> {
    match &global.config {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::load_from_project(project_root)?),
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String, CodescopeError> {
    if is_stdin(path) {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CodescopeError::path_not_found(path.display().to_string()),
        _ => CodescopeError::io_at(path.display().to_string(), e.to_string()),
    })
}

fn emit<T: Serialize>(global: &GlobalArgs, response: &T) -> Result<(), CodescopeError> {
    let mut stdout = io::stdout();
    if global.compact {
        emit_response_compact(response, &mut stdout)?;
    } else {
        emit_response(response, &mut stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
