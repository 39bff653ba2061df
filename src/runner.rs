//! Test execution: runs pytest over the generated test directory.
//!
//! [`CommandExecutor`] is the process-backed [`TestExecutor`]. It expands the
//! configured command template, runs it with stdout and stderr captured, and
//! measures wall time. [`run_tests`] wraps any executor with the directory
//! checks and turns its capture into an [`ExecutionReport`].
//!
//! ## Template Variables
//!
//! - `{python}` - Python interpreter (`python3`, then `python`, from `PATH`)
//! - `{test_dir}` - Directory holding the generated tests

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use codescope_core::execution::{
    ExecutionReport, LaunchError, RawCapture, TestExecutor, VerboseLineParser,
};
use thiserror::Error;
use tracing::{error, info, warn};
use wait_timeout::ChildExt;
use walkdir::WalkDir;

use crate::config::RunConfig;

/// Errors that prevent a test run from being attempted.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Test directory does not exist.
    #[error("Error: Test directory '{path}' does not exist.")]
    TestDirNotFound { path: String },

    /// Command template has no program.
    #[error("test command cannot be empty")]
    EmptyCommand,

    /// Template variable used but not available.
    #[error("template variable '{variable}' not provided")]
    MissingVariable { variable: String },

    /// Test directory could not be listed.
    #[error("cannot list test directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Values substituted into the command template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub python: Option<String>,
    pub test_dir: Option<String>,
}

/// Expand `{python}` and `{test_dir}` in every argument.
pub fn expand_template_vars(
    args: &[String],
    vars: &TemplateVars,
) -> Result<Vec<String>, ExecutorError> {
    if args.is_empty() {
        return Err(ExecutorError::EmptyCommand);
    }
    args.iter().map(|arg| expand_single_var(arg, vars)).collect()
}

fn expand_single_var(s: &str, vars: &TemplateVars) -> Result<String, ExecutorError> {
    let mut result = s.to_string();
    for (name, value) in [("python", &vars.python), ("test_dir", &vars.test_dir)] {
        let placeholder = format!("{{{}}}", name);
        if result.contains(&placeholder) {
            let value = value.as_ref().ok_or_else(|| ExecutorError::MissingVariable {
                variable: name.to_string(),
            })?;
            result = result.replace(&placeholder, value);
        }
    }
    Ok(result)
}

/// Locate a Python interpreter on `PATH`.
pub fn find_python() -> Option<PathBuf> {
    which::which("python3")
        .or_else(|_| which::which("python"))
        .ok()
}

/// `test_*.py` files directly inside `test_dir`, sorted by name.
pub fn list_test_files(test_dir: &Path) -> Result<Vec<String>, ExecutorError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(test_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ExecutorError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with("test_") && name.ends_with(".py") {
            files.push(name.into_owned());
        }
    }
    files.sort();
    Ok(files)
}

// ============================================================================
// Command Executor
// ============================================================================

/// Runs the configured command as a child process.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    command: Vec<String>,
    python: Option<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandExecutor {
    pub fn new(command: Vec<String>) -> Self {
        CommandExecutor {
            command,
            python: None,
            working_dir: None,
            timeout: None,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        let mut executor = CommandExecutor::new(config.test_command.clone());
        executor.timeout = config.timeout();
        executor
    }

    /// Use this interpreter for `{python}` instead of searching `PATH`.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = Some(python.into());
        self
    }

    /// Run the command from this directory (so the project is importable).
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn template_vars(&self, test_dir: &Path) -> TemplateVars {
        TemplateVars {
            python: self
                .python
                .clone()
                .or_else(|| find_python().map(|p| p.display().to_string())),
            test_dir: Some(test_dir.display().to_string()),
        }
    }

    fn wait(&self, child: &mut std::process::Child) -> std::io::Result<Option<ExitStatus>> {
        match self.timeout {
            Some(limit) => child.wait_timeout(limit),
            None => child.wait().map(Some),
        }
    }
}

impl TestExecutor for CommandExecutor {
    fn execute(&self, test_dir: &Path) -> Result<RawCapture, LaunchError> {
        let start = Instant::now();
        let launch_error = |command: &str, message: String| LaunchError {
            command: command.to_string(),
            message,
            execution_seconds: start.elapsed().as_secs_f64(),
        };

        let args = expand_template_vars(&self.command, &self.template_vars(test_dir))
            .map_err(|e| launch_error(&self.command.join(" "), e.to_string()))?;
        let command_line = args.join(" ");
        info!("Running tests with command: {}", command_line);

        let mut cmd = Command::new(&args[0]);
        cmd.args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            error!("Error running tests: {}", e);
            launch_error(&command_line, e.to_string())
        })?;

        // Drain both pipes while waiting so a chatty runner cannot block on a full pipe
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match self.wait(&mut child) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                let elapsed = start.elapsed();
                warn!("Test command timed out after {:?}: {}", elapsed, command_line);
                return Err(launch_error(
                    &command_line,
                    format!(
                        "Command timed out after {:.2} seconds (limit: {} seconds)",
                        elapsed.as_secs_f64(),
                        self.timeout.map_or(0, |t| t.as_secs())
                    ),
                ));
            }
            Err(e) => return Err(launch_error(&command_line, e.to_string())),
        };

        Ok(RawCapture {
            command: command_line,
            return_code: status.code().unwrap_or(-1),
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
            execution_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

// ============================================================================
// Test Stage
// ============================================================================

/// Run the tests in `test_dir` and parse the output.
///
/// A directory with no `test_*.py` file produces the no-tests report without
/// invoking the executor. Launch failures become the failed-run report.
pub fn run_tests(
    executor: &dyn TestExecutor,
    test_dir: &Path,
) -> Result<ExecutionReport, ExecutorError> {
    info!("Running tests in directory: {}", test_dir.display());
    if !test_dir.is_dir() {
        let err = ExecutorError::TestDirNotFound {
            path: test_dir.display().to_string(),
        };
        error!("{}", err);
        return Err(err);
    }

    let test_files = list_test_files(test_dir)?;
    if test_files.is_empty() {
        let report = ExecutionReport::no_tests(&test_dir.display().to_string());
        warn!("No test files found in '{}'", test_dir.display());
        return Ok(report);
    }
    info!("Found {} test files: {}", test_files.len(), test_files.join(", "));

    // Absolute so the command still resolves when run from another directory
    let test_dir = test_dir.canonicalize()?;
    Ok(match executor.execute(&test_dir) {
        Ok(capture) => ExecutionReport::from_capture(capture, &VerboseLineParser, test_files),
        Err(err) => ExecutionReport::from_launch_error(err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    struct CannedExecutor {
        stdout: &'static str,
        calls: Cell<usize>,
    }

    impl TestExecutor for CannedExecutor {
        fn execute(&self, _test_dir: &Path) -> Result<RawCapture, LaunchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(RawCapture {
                command: "pytest".to_string(),
                return_code: 1,
                stdout: self.stdout.to_string(),
                stderr: String::new(),
                execution_seconds: 0.5,
            })
        }
    }

    fn canned(stdout: &'static str) -> CannedExecutor {
        CannedExecutor {
            stdout,
            calls: Cell::new(0),
        }
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    mod templates {
        use super::*;

        #[test]
        fn test_expands_variables() {
            let vars = TemplateVars {
                python: Some("/usr/bin/python3".to_string()),
                test_dir: Some("out/tests".to_string()),
            };
            let expanded =
                expand_template_vars(&args(&["{python}", "-m", "pytest", "{test_dir}"]), &vars)
                    .unwrap();
            assert_eq!(expanded, args(&["/usr/bin/python3", "-m", "pytest", "out/tests"]));
        }

        #[test]
        fn test_missing_variable() {
            let err = expand_template_vars(&args(&["{python}"]), &TemplateVars::default())
                .unwrap_err();
            assert!(matches!(err, ExecutorError::MissingVariable { variable } if variable == "python"));
        }

        #[test]
        fn test_empty_command() {
            let err = expand_template_vars(&[], &TemplateVars::default()).unwrap_err();
            assert!(matches!(err, ExecutorError::EmptyCommand));
        }
    }

    mod stage {
        use super::*;

        #[test]
        fn test_missing_directory() {
            let temp = TempDir::new().unwrap();
            let executor = canned("");
            let err = run_tests(&executor, &temp.path().join("nope")).unwrap_err();
            assert!(matches!(err, ExecutorError::TestDirNotFound { .. }));
        }

        #[test]
        fn test_no_test_files_skips_executor() {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("helper.py"), "").unwrap();
            let executor = canned("");
            let report = run_tests(&executor, temp.path()).unwrap();
            assert!(matches!(report, ExecutionReport::NoTests(_)));
            assert_eq!(executor.calls.get(), 0);
        }

        #[test]
        fn test_capture_is_parsed() {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("test_b.py"), "").unwrap();
            fs::write(temp.path().join("test_a.py"), "").unwrap();
            fs::write(temp.path().join("conftest.py"), "").unwrap();
            let executor = canned("PASSED test_a.py::test_x\nFAILED test_b.py::test_y\n");
            let report = run_tests(&executor, temp.path()).unwrap();
            let ExecutionReport::Completed(run) = &report else {
                panic!("expected completed run");
            };
            assert_eq!(run.test_files_considered, args(&["test_a.py", "test_b.py"]));
            let summary = &report.results().unwrap().summary;
            assert_eq!(summary.total, 2);
            assert_eq!(summary.failed, 1);
        }

        #[test]
        fn test_launch_failure_becomes_failed_run() {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("test_a.py"), "").unwrap();
            let executor = CommandExecutor::new(args(&["codescope-no-such-binary", "{test_dir}"]));
            let report = run_tests(&executor, temp.path()).unwrap();
            let ExecutionReport::Failed(failed) = report else {
                panic!("expected failed run");
            };
            assert!(failed.command.unwrap().starts_with("codescope-no-such-binary"));
            assert!(!failed.error.is_empty());
        }
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        #[test]
        fn test_captures_output_and_exit_code() {
            let temp = TempDir::new().unwrap();
            let executor = CommandExecutor::new(args(&[
                "sh",
                "-c",
                "echo 'PASSED t.py::a'; echo oops >&2; exit 3",
            ]));
            let capture = executor.execute(temp.path()).unwrap();
            assert_eq!(capture.return_code, 3);
            assert_eq!(capture.stdout, "PASSED t.py::a\n");
            assert_eq!(capture.stderr, "oops\n");
            assert!(capture.execution_seconds >= 0.0);
        }

        #[test]
        fn test_timeout_kills_runner() {
            let temp = TempDir::new().unwrap();
            let executor = CommandExecutor::new(args(&["sleep", "5"]))
                .with_timeout(Duration::from_millis(100));
            let err = executor.execute(temp.path()).unwrap_err();
            assert!(err.message.contains("timed out"), "{}", err.message);
            assert_eq!(err.command, "sleep 5");
        }

        #[test]
        fn test_working_dir_is_used() {
            let temp = TempDir::new().unwrap();
            let executor = CommandExecutor::new(args(&["pwd"])).with_working_dir(temp.path());
            let capture = executor.execute(temp.path()).unwrap();
            let reported = PathBuf::from(capture.stdout.trim()).canonicalize().unwrap();
            assert_eq!(reported, temp.path().canonicalize().unwrap());
        }
    }
}
