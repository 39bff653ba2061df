//! The closed set of pipeline operations behind one interface.
//!
//! [`Toolkit`] exposes one method per [`Operation`]. Each method validates its
//! input, runs the stage, and bridges stage errors into [`CodescopeError`], so
//! the CLI and the pipeline driver share the same entry points.

use std::path::Path;

use chrono::NaiveDateTime;
use codescope_core::error::CodescopeError;
use codescope_core::execution::{ExecutionReport, TestExecutor};
use codescope_core::model::{AnalysisBatch, ModuleAnalysis};
use codescope_core::report::{generate_documentation, ReportStatus};
use codescope_python::analyzer;
use codescope_python::files::{collect_python_files_excluding, SourceCollection};
use codescope_python::testgen::{self, GenerationManifest};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::runner::{self, CommandExecutor};

/// A named pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CollectFiles,
    AnalyzeCode,
    GenerateTests,
    RunTests,
    GenerateReport,
}

impl Operation {
    /// Every operation, in pipeline order.
    pub const ALL: [Operation; 5] = [
        Operation::CollectFiles,
        Operation::AnalyzeCode,
        Operation::GenerateTests,
        Operation::RunTests,
        Operation::GenerateReport,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CollectFiles => "collect",
            Operation::AnalyzeCode => "analyze",
            Operation::GenerateTests => "generate",
            Operation::RunTests => "test",
            Operation::GenerateReport => "report",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::CollectFiles => "Collects every Python file under a project directory.",
            Operation::AnalyzeCode => {
                "Analyzes Python code to extract functions, classes, and dependencies."
            }
            Operation::GenerateTests => "Generates pytest test cases based on code analysis.",
            Operation::RunTests => "Runs pytest test cases and captures results.",
            Operation::GenerateReport => {
                "Generates Markdown documentation from code analysis and test results."
            }
        }
    }
}

/// Pipeline operations bound to a configuration and a test executor.
pub struct Toolkit<E> {
    config: Config,
    executor: E,
}

impl Toolkit<CommandExecutor> {
    /// Toolkit that runs tests as a child process configured from `config`.
    pub fn with_command_executor(config: Config) -> Self {
        let executor = CommandExecutor::from_config(&config.run);
        Toolkit::new(config, executor)
    }
}

impl<E: TestExecutor> Toolkit<E> {
    pub fn new(config: Config, executor: E) -> Self {
        Toolkit { config, executor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// [`Operation::CollectFiles`]
    pub fn collect(&self, root: &Path) -> Result<SourceCollection, CodescopeError> {
        Ok(collect_python_files_excluding(root, &self.config.excludes())?)
    }

    /// [`Operation::AnalyzeCode`] over a collector result.
    pub fn analyze(&self, collection: &SourceCollection) -> Vec<ModuleAnalysis> {
        analyzer::analyze_collection(collection)
    }

    /// [`Operation::AnalyzeCode`] over a single source text.
    pub fn analyze_source(&self, source: &str, file_path: &str) -> ModuleAnalysis {
        analyzer::analyze_source(source, file_path)
    }

    /// [`Operation::GenerateTests`]
    pub fn generate(
        &self,
        modules: &[ModuleAnalysis],
        out_dir: &Path,
    ) -> Result<GenerationManifest, CodescopeError> {
        Ok(testgen::generate_tests(modules, out_dir)?)
    }

    /// [`Operation::GenerateTests`] from serialized analysis records.
    pub fn generate_from_json(
        &self,
        analysis_json: &str,
        out_dir: &Path,
    ) -> Result<GenerationManifest, CodescopeError> {
        Ok(testgen::generate_from_json(analysis_json, out_dir)?)
    }

    /// [`Operation::RunTests`]
    pub fn run_tests(&self, test_dir: &Path) -> Result<ExecutionReport, CodescopeError> {
        Ok(runner::run_tests(&self.executor, test_dir)?)
    }

    /// [`Operation::GenerateReport`]
    ///
    /// A failed write is reported in the returned status, not as an error.
    pub fn report(
        &self,
        modules: &[ModuleAnalysis],
        execution: &ExecutionReport,
        output_path: &Path,
        generated_at: NaiveDateTime,
    ) -> ReportStatus {
        generate_documentation(modules, execution, output_path, generated_at)
    }
}

/// Decode analysis records serialized as one record or a list.
pub fn decode_analysis(json: &str) -> Result<Vec<ModuleAnalysis>, CodescopeError> {
    let batch: AnalysisBatch = serde_json::from_str(json)?;
    Ok(batch.into_vec())
}

/// Decode a serialized execution report.
pub fn decode_execution(json: &str) -> Result<ExecutionReport, CodescopeError> {
    Ok(serde_json::from_str(json)?)
}
