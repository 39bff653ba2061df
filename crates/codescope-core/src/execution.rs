//! Test execution results: raw capture, parsed tally, and the result parser seam.
//!
//! The test runner itself is an external collaborator ([`TestExecutor`]). This
//! module only turns its captured output into an [`ExecutionReport`]. Scraping
//! of the runner's text output lives behind [`ResultParser`] so the status-line
//! grammar can be replaced without touching report assembly.
//!
//! ## Verbose line grammar
//!
//! [`VerboseLineParser`] recognizes lines of the form
//!
//! ```text
//! PASSED test_foo.py::test_bar
//! FAILED test_foo.py::test_baz - AssertionError
//! ```
//!
//! Every following non-blank line that does not start with `=` is a detail line
//! of the open case. A format change in the runner degrades this to zero parsed
//! cases rather than an error.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Status and Cases
// ============================================================================

/// Outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Error,
    Xfailed,
    Xpassed,
    Unknown,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Skipped => "SKIPPED",
            TestStatus::Error => "ERROR",
            TestStatus::Xfailed => "XFAILED",
            TestStatus::Xpassed => "XPASSED",
            TestStatus::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for TestStatus {
    type Err = std::convert::Infallible;

    /// Anything outside the closed set collapses to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PASSED" => TestStatus::Passed,
            "FAILED" => TestStatus::Failed,
            "SKIPPED" => TestStatus::Skipped,
            "ERROR" => TestStatus::Error,
            "XFAILED" => TestStatus::Xfailed,
            "XPASSED" => TestStatus::Xpassed,
            _ => TestStatus::Unknown,
        })
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed test case with its detail lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub name: String,
    pub status: TestStatus,
    #[serde(default)]
    pub detail_lines: Vec<String>,
}

/// Tally of parsed cases by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub error: usize,
    pub xfailed: usize,
    pub xpassed: usize,
}

impl ExecutionSummary {
    /// Tally a list of cases. `total` includes cases with `Unknown` status.
    pub fn tally(cases: &[TestCaseResult]) -> Self {
        let mut summary = ExecutionSummary {
            total: cases.len(),
            ..Default::default()
        };
        for case in cases {
            match case.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::Error => summary.error += 1,
                TestStatus::Xfailed => summary.xfailed += 1,
                TestStatus::Xpassed => summary.xpassed += 1,
                TestStatus::Unknown => {}
            }
        }
        summary
    }
}

/// Structured results extracted from runner output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedResults {
    pub cases: Vec<TestCaseResult>,
    pub summary: ExecutionSummary,
}

impl ParsedResults {
    pub fn from_cases(cases: Vec<TestCaseResult>) -> Self {
        let summary = ExecutionSummary::tally(&cases);
        ParsedResults { cases, summary }
    }
}

// ============================================================================
// Result Parsing
// ============================================================================

/// Turns raw runner stdout into structured results.
pub trait ResultParser {
    fn parse(&self, stdout: &str) -> ParsedResults;
}

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(PASSED|FAILED|SKIPPED|XFAILED|XPASSED|ERROR)\s+(.*)")
        .expect("status line pattern is valid")
});

/// Parser for the runner's human-readable status lines (`STATUS name`).
#[derive(Debug, Clone, Copy, Default)]
pub struct VerboseLineParser;

impl ResultParser for VerboseLineParser {
    fn parse(&self, stdout: &str) -> ParsedResults {
        let mut cases: Vec<TestCaseResult> = Vec::new();

        for line in stdout.lines() {
            if let Some(caps) = STATUS_LINE.captures(line) {
                let status = caps[1].parse().unwrap_or(TestStatus::Unknown);
                cases.push(TestCaseResult {
                    name: caps[2].trim().to_string(),
                    status,
                    detail_lines: Vec::new(),
                });
                continue;
            }

            // Lines before the first status line are discarded
            if let Some(current) = cases.last_mut() {
                if !line.trim().is_empty() && !line.starts_with('=') {
                    current.detail_lines.push(line.trim().to_string());
                }
            }
        }

        ParsedResults::from_cases(cases)
    }
}

// ============================================================================
// Execution Collaborator
// ============================================================================

/// Output captured from one run of the external test runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCapture {
    pub command: String,
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub execution_seconds: f64,
}

/// The runner could not be started (or was stopped before completing).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LaunchError {
    pub command: String,
    pub message: String,
    pub execution_seconds: f64,
}

/// External collaborator that runs the generated tests in a directory.
pub trait TestExecutor {
    fn execute(&self, test_dir: &Path) -> Result<RawCapture, LaunchError>;
}

// ============================================================================
// Execution Report
// ============================================================================

/// A completed runner invocation with its parsed results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub command: String,
    pub return_code: i32,
    pub raw_stdout: String,
    pub raw_stderr: String,
    pub execution_seconds: f64,
    #[serde(default)]
    pub results: Option<ParsedResults>,
    #[serde(default)]
    pub test_files_considered: Vec<String>,
}

/// Runner could not be launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailedRun {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub error: String,
    pub execution_seconds: f64,
}

/// The test directory held no test files, so nothing was run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkippedRun {
    pub warning: String,
    pub test_files_found: usize,
}

/// Outcome of the test execution stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionReport {
    Failed(FailedRun),
    NoTests(SkippedRun),
    Completed(CompletedRun),
}

impl ExecutionReport {
    /// Build a report from a raw capture. Results are parsed only when stdout
    /// is non-empty.
    pub fn from_capture(
        capture: RawCapture,
        parser: &dyn ResultParser,
        test_files_considered: Vec<String>,
    ) -> Self {
        let results = if capture.stdout.is_empty() {
            None
        } else {
            Some(parser.parse(&capture.stdout))
        };
        ExecutionReport::Completed(CompletedRun {
            command: capture.command,
            return_code: capture.return_code,
            raw_stdout: capture.stdout,
            raw_stderr: capture.stderr,
            execution_seconds: capture.execution_seconds,
            results,
            test_files_considered,
        })
    }

    pub fn from_launch_error(err: LaunchError) -> Self {
        ExecutionReport::Failed(FailedRun {
            command: Some(err.command),
            error: err.message,
            execution_seconds: err.execution_seconds,
        })
    }

    pub fn no_tests(test_dir: &str) -> Self {
        ExecutionReport::NoTests(SkippedRun {
            warning: format!("Warning: No test files found in '{}'.", test_dir),
            test_files_found: 0,
        })
    }

    /// Parsed results, if the run completed and produced any output.
    pub fn results(&self) -> Option<&ParsedResults> {
        match self {
            ExecutionReport::Completed(run) => run.results.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
