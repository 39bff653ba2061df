//! Full pipeline: collect, analyze, generate, test, report.
//!
//! Stages run strictly in sequence on the calling thread. Per-file and
//! per-module failures are recorded in the stage outputs and never stop the
//! run; only stage-level failures (missing project root, output directory that
//! cannot be created, missing test directory) end it with an error.
//! [`run_in_background`] moves the whole run onto tokio's blocking pool.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use codescope_core::error::CodescopeError;
use codescope_core::execution::{ExecutionReport, TestExecutor};
use codescope_core::model::ModuleAnalysis;
use codescope_core::report::ReportStatus;
use codescope_python::testgen::GenerationManifest;
use serde::Serialize;
use tracing::{info, warn};

use crate::toolkit::{Operation, Toolkit};

/// Where the pipeline reads and writes.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub project_root: PathBuf,
    pub tests_dir: PathBuf,
    pub report_path: PathBuf,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub files_collected: usize,
    pub analyses: Vec<ModuleAnalysis>,
    pub manifest: GenerationManifest,
    pub execution: ExecutionReport,
    pub report: ReportStatus,
}

impl PipelineOutcome {
    /// Number of modules analyzed without error.
    pub fn analyzed_count(&self) -> usize {
        self.analyses.iter().filter(|m| !m.is_error()).count()
    }
}

/// Run every stage in order.
pub fn run_pipeline<E: TestExecutor>(
    toolkit: &Toolkit<E>,
    options: &PipelineOptions,
    generated_at: NaiveDateTime,
) -> Result<PipelineOutcome, CodescopeError> {
    info!(stage = Operation::CollectFiles.name(), root = %options.project_root.display());
    let collection = toolkit.collect(&options.project_root)?;
    let files_collected = collection.files().map_or(0, |files| files.len());
    if collection.is_error() {
        warn!("no Python files collected from {}", options.project_root.display());
    }

    info!(stage = Operation::AnalyzeCode.name(), files = files_collected);
    let analyses = toolkit.analyze(&collection);

    info!(stage = Operation::GenerateTests.name(), out_dir = %options.tests_dir.display());
    let manifest = toolkit.generate(&analyses, &options.tests_dir)?;

    info!(stage = Operation::RunTests.name(), test_dir = %options.tests_dir.display());
    let execution = toolkit.run_tests(&options.tests_dir)?;

    info!(stage = Operation::GenerateReport.name(), path = %options.report_path.display());
    let report = toolkit.report(&analyses, &execution, &options.report_path, generated_at);

    Ok(PipelineOutcome {
        files_collected,
        analyses,
        manifest,
        execution,
        report,
    })
}

/// Run the pipeline on tokio's blocking pool so the caller's task is not
/// blocked.
pub async fn run_in_background<E>(
    toolkit: Toolkit<E>,
    options: PipelineOptions,
    generated_at: NaiveDateTime,
) -> Result<PipelineOutcome, CodescopeError>
where
    E: TestExecutor + Send + 'static,
{
    tokio::task::spawn_blocking(move || run_pipeline(&toolkit, &options, generated_at))
        .await
        .map_err(|e| CodescopeError::internal(format!("pipeline task failed: {}", e)))?
}
