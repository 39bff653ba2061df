//! Pytest skeleton generation from structural analysis records.
//!
//! Every analyzed module produces one `test_<stem>.py` file in the output
//! directory. Public functions and methods get a stub whose body is chosen by
//! the name heuristics in [`heuristics`]; public classes get a fixture that
//! builds a no-argument instance.
//!
//! Failure records are skipped with a warning, as are modules whose test file
//! cannot be written. Only a failure to create the output directory aborts the
//! whole batch.

pub mod heuristics;
pub mod template;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use codescope_core::model::{AnalysisBatch, AnalyzedModule, ModuleAnalysis};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use heuristics::{select_stub, Bucket, StubKind, FUNCTION_BUCKETS, METHOD_BUCKETS};
pub use template::{import_path, render_test_file};

// ============================================================================
// Error Types
// ============================================================================

/// Errors fatal to a generation batch.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The analysis input is not a record or a list of records.
    #[error("cannot decode analysis: {0}")]
    AnalysisDecode(#[from] serde_json::Error),

    /// The output directory could not be created.
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir { path: PathBuf, source: io::Error },
}

pub type GenerateResult<T> = Result<T, GenerateError>;

// ============================================================================
// Manifest
// ============================================================================

/// A module for which no test file was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedModule {
    pub file_path: String,
    pub reason: String,
}

/// Summary of one generation batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationManifest {
    pub generated_test_files: Vec<String>,
    pub file_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedModule>,
}

// ============================================================================
// Generation
// ============================================================================

/// `test_<stem>.py` for a module path.
pub fn test_file_name(file_path: &str) -> String {
    let normalized = file_path.replace('\\', "/");
    let base = normalized.rsplit('/').next().unwrap_or(&normalized);
    let stem = base.strip_suffix(".py").unwrap_or(base);
    format!("test_{}.py", stem)
}

/// Write one test file per analyzed module into `out_dir`.
///
/// Existing files with the same name are overwritten.
pub fn generate_tests(modules: &[ModuleAnalysis], out_dir: &Path) -> GenerateResult<GenerationManifest> {
    info!(out_dir = %out_dir.display(), modules = modules.len(), "generating test files");
    fs::create_dir_all(out_dir).map_err(|source| GenerateError::OutputDir {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut manifest = GenerationManifest::default();
    for analysis in modules {
        match analysis {
            ModuleAnalysis::Failed(failed) => {
                warn!(
                    "Skipping test generation for {}: {}",
                    failed.file_path, failed.error
                );
                manifest.skipped.push(SkippedModule {
                    file_path: failed.file_path.clone(),
                    reason: failed.error.clone(),
                });
            }
            ModuleAnalysis::Analyzed(module) => match write_test_file(module, out_dir) {
                Ok(path) => {
                    info!("Generated test file: {}", path.display());
                    manifest
                        .generated_test_files
                        .push(path.to_string_lossy().into_owned());
                }
                Err(e) => {
                    warn!(file = %module.file_path, "cannot write test file: {}", e);
                    manifest.skipped.push(SkippedModule {
                        file_path: module.file_path.clone(),
                        reason: e.to_string(),
                    });
                }
            },
        }
    }
    manifest.file_count = manifest.generated_test_files.len();
    info!("Generated {} test files", manifest.file_count);
    Ok(manifest)
}

/// Decode a record or list of records and generate tests for them.
pub fn generate_from_json(analysis_json: &str, out_dir: &Path) -> GenerateResult<GenerationManifest> {
    let batch: AnalysisBatch = serde_json::from_str(analysis_json)?;
    generate_tests(&batch.into_vec(), out_dir)
}

fn write_test_file(module: &AnalyzedModule, out_dir: &Path) -> io::Result<PathBuf> {
    let path = out_dir.join(test_file_name(&module.file_path));
    fs::write(&path, render_test_file(module))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze_source;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        assert_eq!(test_file_name("pkg/utils.py"), "test_utils.py");
        assert_eq!(test_file_name("main.py"), "test_main.py");
        assert_eq!(test_file_name("pkg\\win.py"), "test_win.py");
    }

    #[test]
    fn failed_modules_are_skipped() {
        let dir = TempDir::new().unwrap();
        let modules = vec![
            analyze_source("def get_x():\n    return 1\n", "good.py"),
            ModuleAnalysis::failed("bad.py", "Syntax error in bad.py: boom"),
        ];
        let manifest = generate_tests(&modules, dir.path()).unwrap();
        assert_eq!(manifest.file_count, 1);
        assert!(manifest.generated_test_files[0].ends_with("test_good.py"));
        assert_eq!(manifest.skipped.len(), 1);
        assert_eq!(manifest.skipped[0].file_path, "bad.py");
        assert!(!dir.path().join("test_bad.py").exists());
    }

    #[test]
    fn output_directory_is_created_and_files_overwritten() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("tests");
        let target = out.join("test_mod.py");
        fs::create_dir_all(&out).unwrap();
        fs::write(&target, "stale").unwrap();
        let modules = vec![analyze_source("def run():\n    pass\n", "mod.py")];
        generate_tests(&modules, &out).unwrap();
        let content = fs::read_to_string(&target).unwrap();
        assert!(content.starts_with("# Generated test file for mod.py\n"));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn json_input_accepts_single_record_or_list() {
        let dir = TempDir::new().unwrap();
        let single = serde_json::to_string(&analyze_source("X = 1\n", "a.py")).unwrap();
        assert_eq!(generate_from_json(&single, dir.path()).unwrap().file_count, 1);

        let list = serde_json::to_string(&vec![
            analyze_source("X = 1\n", "a.py"),
            analyze_source("Y = 2\n", "b.py"),
        ])
        .unwrap();
        assert_eq!(generate_from_json(&list, dir.path()).unwrap().file_count, 2);
    }

    #[test]
    fn undecodable_analysis_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = generate_from_json("{\"not\": \"analysis\"}", dir.path()).unwrap_err();
        assert!(matches!(err, GenerateError::AnalysisDecode(_)));
        let err = generate_from_json("not json", dir.path()).unwrap_err();
        assert!(matches!(err, GenerateError::AnalysisDecode(_)));
    }

    #[test]
    fn unwritable_output_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = generate_tests(&[], &blocker.join("out")).unwrap_err();
        assert!(matches!(err, GenerateError::OutputDir { .. }));
    }
}
