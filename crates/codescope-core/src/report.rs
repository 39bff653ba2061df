//! Documentation report assembly.
//!
//! Merges the per-module structural records and the execution report into one
//! Markdown document. Sections always appear in this order:
//!
//! 1. Project overview (metrics over error-free modules only)
//! 2. File structure (every analyzed path, including failed modules)
//! 3. Code documentation (one block per module)
//! 4. Test results
//! 5. Recommendations (missing docstrings, test/function ratio)
//!
//! Assembly itself cannot fail. Only [`write_report`] touches the filesystem,
//! and it reports failures as a [`ReportStatus`] instead of an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::execution::{CompletedRun, ExecutionReport, TestCaseResult, TestStatus};
use crate::model::{AnalyzedModule, ClassInfo, FunctionInfo, ModuleAnalysis};

/// Maximum number of missing-docstring items listed in recommendations.
pub const MISSING_DOCSTRING_LIMIT: usize = 10;

// ============================================================================
// Report Status
// ============================================================================

/// Outcome of writing the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Success,
    Error,
}

/// Status object returned by [`write_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStatus {
    pub status: ReportState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub message: String,
}

impl ReportStatus {
    pub fn is_success(&self) -> bool {
        self.status == ReportState::Success
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Assemble the full Markdown report.
pub fn assemble_report(
    modules: &[ModuleAnalysis],
    execution: &ExecutionReport,
    generated_at: NaiveDateTime,
) -> String {
    let mut doc = String::from("# Code Analysis and Test Documentation\n\n");
    doc.push_str(&format!(
        "*Generated on {}*\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    doc.push_str(&render_overview(modules));
    doc.push_str(&render_file_structure(modules));
    doc.push_str(&render_code_documentation(modules));
    doc.push_str(&render_test_results(execution));
    doc.push_str(&render_recommendations(modules, execution));
    doc
}

/// Write an assembled report to `output_path`, creating parent directories.
pub fn write_report(output_path: &Path, content: &str) -> ReportStatus {
    let path_text = output_path.display().to_string();

    let result = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::write(output_path, content));

    match result {
        Ok(()) => {
            info!(path = %path_text, "documentation generated");
            ReportStatus {
                status: ReportState::Success,
                output_path: Some(path_text.clone()),
                message: format!("Documentation successfully generated at {}", path_text),
            }
        }
        Err(e) => {
            let message = format!("Error generating documentation: {}", e);
            error!("{}", message);
            ReportStatus {
                status: ReportState::Error,
                output_path: None,
                message,
            }
        }
    }
}

/// Assemble and write the report in one step.
pub fn generate_documentation(
    modules: &[ModuleAnalysis],
    execution: &ExecutionReport,
    output_path: &Path,
    generated_at: NaiveDateTime,
) -> ReportStatus {
    info!(path = %output_path.display(), modules = modules.len(), "generating documentation");
    let content = assemble_report(modules, execution, generated_at);
    write_report(output_path, &content)
}

fn analyzed(modules: &[ModuleAnalysis]) -> impl Iterator<Item = &AnalyzedModule> {
    modules.iter().filter_map(ModuleAnalysis::as_analyzed)
}

/// Dunder names are documented; single-underscore names are private.
fn is_documented_name(name: &str) -> bool {
    !name.starts_with('_') || name.starts_with("__")
}

// ============================================================================
// Overview
// ============================================================================

fn render_overview(modules: &[ModuleAnalysis]) -> String {
    let valid: Vec<&AnalyzedModule> = analyzed(modules).collect();
    let total_loc: usize = valid.iter().map(|m| m.metrics.lines_of_code).sum();
    let total_functions: usize = valid.iter().map(|m| m.metrics.function_count).sum();
    let total_classes: usize = valid.iter().map(|m| m.metrics.class_count).sum();

    let mut out = String::from("## Project Overview\n\n");
    out.push_str(&format!(
        "This documentation covers {} Python files.\n\n",
        valid.len()
    ));
    out.push_str("### Project Metrics\n\n");
    out.push_str("| Metric | Count |\n");
    out.push_str("| ------ | ----- |\n");
    out.push_str(&format!("| Python Files | {} |\n", valid.len()));
    out.push_str(&format!("| Lines of Code | {} |\n", total_loc));
    out.push_str(&format!("| Functions | {} |\n", total_functions));
    out.push_str(&format!("| Classes | {} |\n\n", total_classes));
    out
}

// ============================================================================
// File Structure
// ============================================================================

#[derive(Default)]
struct TreeNode {
    dirs: BTreeMap<String, TreeNode>,
    files: Vec<String>,
}

impl TreeNode {
    fn insert(&mut self, path: &str) {
        let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some(file) = parts.pop() else {
            return;
        };
        let mut node = self;
        for dir in parts {
            node = node.dirs.entry(dir.to_string()).or_default();
        }
        node.files.push(file.to_string());
    }

    fn render(&self, prefix: &str, out: &mut String) {
        let total = self.dirs.len() + self.files.len();
        let mut index = 0;

        for (name, child) in &self.dirs {
            index += 1;
            let last = index == total;
            out.push_str(&format!("{}{}{}/\n", prefix, connector(last), name));
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            child.render(&child_prefix, out);
        }

        for file in &self.files {
            index += 1;
            out.push_str(&format!("{}{}{}\n", prefix, connector(index == total), file));
        }
    }
}

fn connector(last: bool) -> &'static str {
    if last {
        "└── "
    } else {
        "├── "
    }
}

fn render_file_structure(modules: &[ModuleAnalysis]) -> String {
    let mut paths: Vec<&str> = modules.iter().map(ModuleAnalysis::file_path).collect();
    paths.sort_unstable();

    let mut root = TreeNode::default();
    for path in paths {
        root.insert(path);
    }

    let mut out = String::from("## File Structure\n\n```\n");
    root.render("", &mut out);
    out.push_str("```\n\n");
    out
}

// ============================================================================
// Code Documentation
// ============================================================================

fn render_code_documentation(modules: &[ModuleAnalysis]) -> String {
    let mut out = String::from("## Code Documentation\n\n");
    for module in modules {
        out.push_str(&render_module(module));
    }
    out
}

fn render_module(module: &ModuleAnalysis) -> String {
    let module = match module {
        ModuleAnalysis::Failed(failed) => {
            return format!("### {}\n\n**Error:** {}\n\n", failed.file_path, failed.error);
        }
        ModuleAnalysis::Analyzed(m) => m,
    };

    let mut out = format!("### {}\n\n", module.file_path);
    if let Some(doc) = doc_text(&module.module_docstring) {
        out.push_str(&format!("{}\n\n", doc));
    }

    let metrics = &module.metrics;
    out.push_str("#### Metrics\n\n");
    out.push_str("| Metric | Value |\n");
    out.push_str("| ------ | ----- |\n");
    out.push_str(&format!("| Lines of Code | {} |\n", metrics.lines_of_code));
    out.push_str(&format!("| Functions | {} |\n", metrics.function_count));
    out.push_str(&format!("| Classes | {} |\n", metrics.class_count));
    out.push_str(&format!("| Imports | {} |\n\n", metrics.import_count));

    if !module.classes.is_empty() {
        out.push_str("#### Classes\n\n");
        for class in &module.classes {
            out.push_str(&render_class(class));
        }
    }

    if !module.functions.is_empty() {
        out.push_str("#### Functions\n\n");
        for func in module
            .functions
            .iter()
            .filter(|f| is_documented_name(&f.name))
        {
            out.push_str(&format!("##### `{}`", signature(func)));
            if let Some(ret) = &func.return_type {
                out.push_str(&format!(" -> {}", ret));
            }
            out.push_str("\n\n");
            if let Some(doc) = doc_text(&func.docstring) {
                out.push_str(&format!("{}\n\n", doc));
            }
        }
    }

    if !module.imports.is_empty() {
        out.push_str("#### Dependencies\n\n");
        for import in &module.imports {
            match &import.alias {
                Some(alias) => out.push_str(&format!("- `{}` as `{}`\n", import.module, alias)),
                None => out.push_str(&format!("- `{}`\n", import.module)),
            }
        }
        out.push('\n');
    }

    out
}

/// A docstring worth showing; empty and blank docstrings count as missing.
fn doc_text(docstring: &Option<String>) -> Option<&str> {
    docstring.as_deref().filter(|doc| !doc.trim().is_empty())
}

fn signature(func: &FunctionInfo) -> String {
    format!("{}({})", func.name, func.signature_params())
}

fn render_class(class: &ClassInfo) -> String {
    let mut out = format!("##### `{}`\n\n", class.name);

    if let Some(doc) = doc_text(&class.docstring) {
        out.push_str(&format!("{}\n\n", doc));
    }
    if !class.base_classes.is_empty() {
        out.push_str(&format!(
            "**Inherits from:** {}\n\n",
            class.base_classes.join(", ")
        ));
    }

    if !class.methods.is_empty() {
        out.push_str("**Methods:**\n\n");
        for method in class
            .methods
            .iter()
            .filter(|m| is_documented_name(&m.name))
        {
            out.push_str(&format!("- `{}`", signature(method)));
            if let Some(ret) = &method.return_type {
                out.push_str(&format!(" -> {}", ret));
            }
            out.push('\n');
            if let Some(doc) = doc_text(&method.docstring) {
                out.push_str(&format!("  - {}\n", doc));
            }
        }
        out.push('\n');
    }

    if !class.attributes.is_empty() {
        out.push_str("**Attributes:**\n\n");
        for attr in &class.attributes {
            out.push_str(&format!("- `{}`", attr.name));
            if let Some(value) = &attr.value_expr {
                out.push_str(&format!(" = {}", value));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

// ============================================================================
// Test Results
// ============================================================================

fn render_test_results(execution: &ExecutionReport) -> String {
    let mut out = String::from("## Test Results\n\n");

    let run = match execution {
        ExecutionReport::Failed(failed) => {
            out.push_str(&format!("**Error running tests:** {}\n\n", failed.error));
            return out;
        }
        ExecutionReport::NoTests(skipped) => {
            out.push_str(&format!("**Warning:** {}\n\n", skipped.warning));
            return out;
        }
        ExecutionReport::Completed(run) => run,
    };

    if let Some(results) = &run.results {
        let summary = &results.summary;
        out.push_str("### Summary\n\n");
        out.push_str("| Metric | Count |\n");
        out.push_str("| ------ | ----- |\n");
        out.push_str(&format!("| Total Tests | {} |\n", summary.total));
        out.push_str(&format!("| Passed | {} |\n", summary.passed));
        out.push_str(&format!("| Failed | {} |\n", summary.failed));
        out.push_str(&format!("| Skipped | {} |\n", summary.skipped));
        out.push_str(&format!("| Errors | {} |\n", summary.error));
        out.push_str(&format!("| Expected Failures | {} |\n", summary.xfailed));
        out.push_str(&format!("| Unexpected Passes | {} |\n\n", summary.xpassed));
    }

    out.push_str(&format!(
        "**Execution Time:** {:.2} seconds\n\n",
        run.execution_seconds
    ));
    out.push_str(&render_test_files(run));

    match &run.results {
        Some(results) if !results.cases.is_empty() => {
            out.push_str(&render_detailed_results(&results.cases));
        }
        Some(_) => {}
        None if !run.raw_stdout.is_empty() => {
            out.push_str("### Raw Output\n\n");
            out.push_str(&fenced(&run.raw_stdout));
        }
        None => {}
    }

    if !run.raw_stderr.is_empty() {
        out.push_str("### Errors\n\n");
        out.push_str(&fenced(&run.raw_stderr));
    }

    out
}

fn render_test_files(run: &CompletedRun) -> String {
    if run.test_files_considered.is_empty() {
        return String::new();
    }
    let mut out = String::from("### Test Files\n\n");
    for file in &run.test_files_considered {
        out.push_str(&format!("- `{}`\n", file));
    }
    out.push('\n');
    out
}

/// Group cases by status, keeping the order in which statuses first appear.
fn group_by_status(cases: &[TestCaseResult]) -> Vec<(TestStatus, Vec<&TestCaseResult>)> {
    let mut groups: Vec<(TestStatus, Vec<&TestCaseResult>)> = Vec::new();
    for case in cases {
        match groups.iter_mut().find(|(status, _)| *status == case.status) {
            Some((_, members)) => members.push(case),
            None => groups.push((case.status, vec![case])),
        }
    }
    groups
}

fn render_detailed_results(cases: &[TestCaseResult]) -> String {
    let mut out = String::from("### Detailed Results\n\n");
    for (status, members) in group_by_status(cases) {
        out.push_str(&format!("#### {} Tests ({})\n\n", status, members.len()));
        for case in members {
            out.push_str(&format!("- `{}`\n", case.name));
            if !case.detail_lines.is_empty() {
                out.push_str("  ```\n");
                for line in &case.detail_lines {
                    out.push_str(&format!("  {}\n", line));
                }
                out.push_str("  ```\n");
            }
        }
        out.push('\n');
    }
    out
}

fn fenced(text: &str) -> String {
    let mut out = String::from("```\n");
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n\n");
    out
}

// ============================================================================
// Recommendations
// ============================================================================

struct Recommendation {
    title: &'static str,
    description: String,
    items: Vec<String>,
}

/// Every public module, class, and function that lacks a docstring.
fn missing_docstrings(modules: &[ModuleAnalysis]) -> Vec<String> {
    let mut missing = Vec::new();
    for module in analyzed(modules) {
        let path = &module.file_path;
        if doc_text(&module.module_docstring).is_none() {
            missing.push(format!("{} (module)", path));
        }
        for class in module.classes.iter().filter(|c| c.is_public()) {
            if doc_text(&class.docstring).is_none() {
                missing.push(format!("{} (class {})", path, class.name));
            }
        }
        for func in module.functions.iter().filter(|f| f.is_public()) {
            if doc_text(&func.docstring).is_none() {
                missing.push(format!("{} (function {})", path, func.name));
            }
        }
    }
    missing
}

fn render_recommendations(modules: &[ModuleAnalysis], execution: &ExecutionReport) -> String {
    let mut recommendations = Vec::new();

    let missing = missing_docstrings(modules);
    if !missing.is_empty() {
        let overflow = missing.len().saturating_sub(MISSING_DOCSTRING_LIMIT);
        let mut items: Vec<String> = missing.into_iter().take(MISSING_DOCSTRING_LIMIT).collect();
        if overflow > 0 {
            items.push(format!("... and {} more", overflow));
        }
        recommendations.push(Recommendation {
            title: "Improve Documentation",
            description: "The following components are missing docstrings:".to_string(),
            items,
        });
    }

    if let Some(results) = execution.results() {
        let total_tests = results.cases.len();
        let total_functions: usize = analyzed(modules).map(|m| m.metrics.function_count).sum();
        if total_tests < total_functions {
            recommendations.push(Recommendation {
                title: "Improve Test Coverage",
                description: format!(
                    "The project has {} tests for {} functions. Consider adding more tests to improve coverage.",
                    total_tests, total_functions
                ),
                items: Vec::new(),
            });
        }
    }

    let mut out = String::from("## Recommendations\n\n");
    if recommendations.is_empty() {
        out.push_str("No specific recommendations at this time.\n\n");
        return out;
    }

    for (i, rec) in recommendations.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, rec.title));
        out.push_str(&format!("{}\n\n", rec.description));
        if !rec.items.is_empty() {
            for item in &rec.items {
                out.push_str(&format!("- {}\n", item));
            }
            out.push('\n');
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{
        ExecutionSummary, FailedRun, ParsedResults, RawCapture, ResultParser, VerboseLineParser,
    };
    use crate::model::{AttributeInfo, ImportInfo, ModuleMetrics, ParameterSpec};
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn function(name: &str, docstring: Option<&str>) -> FunctionInfo {
        FunctionInfo {
            name: name.to_string(),
            parameters: vec![ParameterSpec::new("x")],
            default_values: vec![],
            return_type: Some("int".to_string()),
            decorators: vec![],
            docstring: docstring.map(str::to_string),
            is_async: false,
            start_line: 1,
            end_line: Some(2),
        }
    }

    fn module(path: &str, functions: Vec<FunctionInfo>, loc: usize) -> ModuleAnalysis {
        ModuleAnalysis::Analyzed(AnalyzedModule {
            file_path: path.to_string(),
            module_docstring: Some(format!("Docs for {}.", path)),
            metrics: ModuleMetrics {
                lines_of_code: loc,
                function_count: functions.len(),
                class_count: 0,
                import_count: 0,
            },
            functions,
            classes: vec![],
            imports: vec![],
            globals: vec![],
        })
    }

    fn completed(stdout: &str) -> ExecutionReport {
        ExecutionReport::from_capture(
            RawCapture {
                command: "python -m pytest out -v".to_string(),
                return_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
                execution_seconds: 1.234,
            },
            &VerboseLineParser,
            vec!["test_a.py".to_string()],
        )
    }

    mod overview {
        use super::*;

        #[test]
        fn counts_only_error_free_modules() {
            let modules = vec![
                module("a.py", vec![function("f", Some("d"))], 10),
                module("pkg/b.py", vec![function("g", Some("d"))], 20),
                module("pkg/c.py", vec![], 5),
                module("pkg/sub/d.py", vec![function("h", Some("d"))], 7),
                ModuleAnalysis::failed("broken.py", "Syntax error in broken.py"),
            ];
            let report = assemble_report(&modules, &completed(""), timestamp());

            assert!(report.contains("This documentation covers 4 Python files."));
            assert!(report.contains("| Lines of Code | 42 |"));
            assert!(report.contains("| Functions | 3 |"));

            let tree_start = report.find("## File Structure").unwrap();
            let tree_end = report.find("## Code Documentation").unwrap();
            let tree = &report[tree_start..tree_end];
            for name in ["a.py", "b.py", "c.py", "d.py", "broken.py"] {
                assert!(tree.contains(name), "tree is missing {}", name);
            }
        }
    }

    mod file_structure {
        use super::*;

        #[test]
        fn nested_directories_are_indented() {
            let modules = vec![
                module("pkg/sub/deep.py", vec![], 1),
                module("pkg/mod.py", vec![], 1),
                module("top.py", vec![], 1),
            ];
            let tree = render_file_structure(&modules);
            let expected = "```\n├── pkg/\n│   ├── sub/\n│   │   └── deep.py\n│   └── mod.py\n└── top.py\n```";
            assert!(tree.contains(expected), "unexpected tree:\n{}", tree);
        }
    }

    mod module_documentation {
        use super::*;

        #[test]
        fn failed_module_renders_only_error() {
            let rendered = render_module(&ModuleAnalysis::failed("bad.py", "Syntax error"));
            assert_eq!(rendered, "### bad.py\n\n**Error:** Syntax error\n\n");
        }

        #[test]
        fn class_members_imports_and_private_filtering() {
            let mut private = function("_hidden", None);
            private.return_type = None;
            let ModuleAnalysis::Analyzed(mut m) =
                module("svc.py", vec![function("run", Some("Run it.")), private], 30)
            else {
                unreachable!()
            };
            m.classes.push(ClassInfo {
                name: "Service".to_string(),
                base_classes: vec!["Base".to_string(), "Mixin".to_string()],
                methods: vec![function("__init__", None), function("_secret", None)],
                attributes: vec![AttributeInfo {
                    name: "LIMIT".to_string(),
                    value_expr: Some("10".to_string()),
                    line: 3,
                }],
                docstring: Some("A service.".to_string()),
                start_line: 2,
                end_line: Some(9),
            });
            m.imports.push(ImportInfo {
                module: "numpy".to_string(),
                alias: Some("np".to_string()),
                line: 1,
            });
            m.imports.push(ImportInfo {
                module: "os.path".to_string(),
                alias: None,
                line: 1,
            });

            let rendered = render_module(&ModuleAnalysis::Analyzed(m));
            assert!(rendered.contains("##### `run(x)` -> int"));
            assert!(rendered.contains("Run it."));
            assert!(!rendered.contains("_hidden"));
            assert!(rendered.contains("**Inherits from:** Base, Mixin"));
            assert!(rendered.contains("- `__init__(x)` -> int"));
            assert!(!rendered.contains("_secret"));
            assert!(rendered.contains("- `LIMIT` = 10"));
            assert!(rendered.contains("- `numpy` as `np`"));
            assert!(rendered.contains("- `os.path`\n"));
        }
    }

    mod test_results {
        use super::*;

        #[test]
        fn cases_grouped_by_status_with_details() {
            let report = completed(
                "PASSED test_a.py::test_one\nFAILED test_a.py::test_two\n    assert 1 == 2\nPASSED test_a.py::test_three\n",
            );
            let rendered = render_test_results(&report);
            assert!(rendered.contains("| Total Tests | 3 |"));
            assert!(rendered.contains("**Execution Time:** 1.23 seconds"));
            assert!(rendered.contains("- `test_a.py`"));
            assert!(rendered.contains("#### PASSED Tests (2)"));
            assert!(rendered.contains("#### FAILED Tests (1)"));
            assert!(rendered.contains("  ```\n  assert 1 == 2\n  ```\n"));
            assert!(rendered.find("PASSED Tests").unwrap() < rendered.find("FAILED Tests").unwrap());
        }

        #[test]
        fn missing_results_fall_back_to_raw_output() {
            let report = ExecutionReport::Completed(CompletedRun {
                command: "pytest".to_string(),
                return_code: 2,
                raw_stdout: "collected 0 items".to_string(),
                raw_stderr: "ImportError: no module".to_string(),
                execution_seconds: 0.1,
                results: None,
                test_files_considered: vec![],
            });
            let rendered = render_test_results(&report);
            assert!(rendered.contains("### Raw Output\n\n```\ncollected 0 items\n```"));
            assert!(rendered.contains("### Errors\n\n```\nImportError: no module\n```"));
            assert!(!rendered.contains("### Summary"));
        }

        #[test]
        fn launch_error_is_reported() {
            let report = ExecutionReport::Failed(FailedRun {
                command: None,
                error: "pytest not found".to_string(),
                execution_seconds: 0.0,
            });
            let rendered = render_test_results(&report);
            assert!(rendered.contains("**Error running tests:** pytest not found"));
        }
    }

    mod recommendations {
        use super::*;

        #[test]
        fn missing_docstring_list_is_capped_at_ten() {
            // 3 modules x (module + 4 functions) = 15 undocumented symbols
            let modules: Vec<ModuleAnalysis> = (0..3)
                .map(|i| {
                    let funcs = (0..4).map(|j| function(&format!("f{}", j), None)).collect();
                    let ModuleAnalysis::Analyzed(mut m) = module(&format!("m{}.py", i), funcs, 1)
                    else {
                        unreachable!()
                    };
                    m.module_docstring = None;
                    ModuleAnalysis::Analyzed(m)
                })
                .collect();

            let rendered = render_recommendations(&modules, &completed(""));
            let items: Vec<&str> = rendered.lines().filter(|l| l.starts_with("- ")).collect();
            assert_eq!(items.len(), 11);
            assert_eq!(items[10], "- ... and 5 more");
        }

        #[test]
        fn coverage_suggestion_when_fewer_tests_than_functions() {
            let modules = vec![module(
                "a.py",
                vec![function("f", Some("d")), function("g", Some("d"))],
                4,
            )];
            let rendered = render_recommendations(&modules, &completed("PASSED test_a.py::test_f\n"));
            assert!(rendered.contains("### 1. Improve Test Coverage"));
            assert!(rendered.contains("The project has 1 tests for 2 functions."));
        }

        #[test]
        fn no_recommendations_message() {
            let modules = vec![module("a.py", vec![function("f", Some("d"))], 4)];
            let rendered = render_recommendations(&modules, &completed("PASSED test_a.py::test_f\n"));
            assert!(rendered.contains("No specific recommendations at this time."));
        }

        #[test]
        fn blank_docstrings_count_as_missing() {
            let ModuleAnalysis::Analyzed(mut m) = module(
                "a.py",
                vec![function("f", Some("")), function("g", Some("  \n "))],
                4,
            ) else {
                unreachable!()
            };
            m.module_docstring = Some(String::new());
            let modules = vec![ModuleAnalysis::Analyzed(m)];
            assert_eq!(
                missing_docstrings(&modules),
                vec!["a.py (module)", "a.py (function f)", "a.py (function g)"]
            );
        }

        #[test]
        fn private_functions_are_not_flagged() {
            let modules = vec![module("a.py", vec![function("_private", None)], 4)];
            assert!(missing_docstrings(&modules).is_empty());
        }
    }

    mod writing {
        use super::*;

        #[test]
        fn write_creates_parent_directories() {
            let temp = tempfile::tempdir().unwrap();
            let path = temp.path().join("docs/nested/report.md");
            let status = write_report(&path, "# Report\n");
            assert!(status.is_success());
            assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Report\n");
        }

        #[test]
        fn write_failure_becomes_error_status() {
            let temp = tempfile::tempdir().unwrap();
            // A regular file cannot act as a parent directory
            let blocker = temp.path().join("blocker");
            std::fs::write(&blocker, "x").unwrap();
            let status = write_report(&blocker.join("report.md"), "content");
            assert_eq!(status.status, ReportState::Error);
            assert!(status.message.starts_with("Error generating documentation:"));
            assert!(status.output_path.is_none());
        }

        #[test]
        fn sections_appear_in_fixed_order() {
            let modules = vec![module("a.py", vec![], 1)];
            let report = assemble_report(&modules, &completed(""), timestamp());
            let order = [
                "*Generated on 2024-05-17 09:30:00*",
                "## Project Overview",
                "## File Structure",
                "## Code Documentation",
                "## Test Results",
                "## Recommendations",
            ];
            let positions: Vec<usize> = order.iter().map(|s| report.find(s).unwrap()).collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn summary_parser_is_used_through_trait_object() {
        let parser: &dyn ResultParser = &VerboseLineParser;
        let parsed: ParsedResults = parser.parse("PASSED a\n");
        assert_eq!(parsed.summary, ExecutionSummary { total: 1, passed: 1, ..Default::default() });
    }
}
