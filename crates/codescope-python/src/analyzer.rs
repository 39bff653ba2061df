//! Structural analysis of Python modules.
//!
//! [`analyze_source`] parses one module and walks its immediate top-level
//! statements, producing a [`ModuleAnalysis`]: functions, classes (with their
//! methods and class-level assignments), imports, module-level assignments,
//! the module docstring and size metrics. Nested definitions inside functions
//! are not enumerated.
//!
//! Analysis never fails: malformed syntax becomes a failure record carrying the
//! error message and a rendered source snippet.

use std::collections::BTreeMap;

use annotate_snippets::{Level, Renderer, Snippet};
use codescope_core::model::{
    AnalyzedModule, AttributeInfo, ClassInfo, FailedModule, FunctionInfo, ImportInfo,
    ModuleAnalysis, ModuleMetrics, ParameterSpec,
};
use tracing::{debug, error, warn};

use crate::files::{is_read_error, SourceCollection};
use crate::parser::ast::{self, Alias, Arg, ClassDef, Expr, FunctionDef, Stmt};
use crate::parser::{parse_module_with, ParserError};

/// Lines of context shown around a syntax error in the rendered diagnostic.
const DIAGNOSTIC_CONTEXT: usize = 1;

// ============================================================================
// Entry Points
// ============================================================================

/// Analyze one module's source text.
///
/// `file_path` is the logical path recorded in the result; it is not read.
/// Parsing and extraction run on the parser's own thread, so deeply nested
/// source cannot exhaust the caller's stack.
pub fn analyze_source(source: &str, file_path: &str) -> ModuleAnalysis {
    debug!(file = file_path, "analyzing module");
    match parse_module_with(source, |module| build_module(&module.body, source, file_path)) {
        Ok(module) => ModuleAnalysis::Analyzed(module),
        Err(err) => {
            let message = format!("Syntax error in {}: {}", file_path, err);
            error!("{}", message);
            ModuleAnalysis::Failed(FailedModule {
                file_path: file_path.to_string(),
                error: message,
                diagnostic: Some(render_diagnostic(source, file_path, &err)),
            })
        }
    }
}

/// Analyze every entry of a `{path: content}` mapping.
///
/// Entries whose content is a collector read-error sentinel are not parsed;
/// they become failure records carrying the sentinel text. The result has
/// exactly one record per entry, in path order.
pub fn analyze_files(files: &BTreeMap<String, String>) -> Vec<ModuleAnalysis> {
    let mut results = Vec::with_capacity(files.len());
    for (path, content) in files {
        if is_read_error(content) {
            warn!(file = %path, "skipping unreadable file: {}", content);
            results.push(ModuleAnalysis::failed(path.as_str(), content.as_str()));
            continue;
        }
        results.push(analyze_source(content, path));
    }
    let failed = results.iter().filter(|m| m.is_error()).count();
    debug!(total = results.len(), failed, "batch analysis complete");
    results
}

/// Analyze a collector result. The error shape yields no records.
pub fn analyze_collection(collection: &SourceCollection) -> Vec<ModuleAnalysis> {
    match collection {
        SourceCollection::Files(files) => analyze_files(files),
        SourceCollection::Error(failure) => {
            warn!("nothing to analyze: {}", failure.error);
            Vec::new()
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

fn build_module(body: &[Stmt<'_>], source: &str, file_path: &str) -> AnalyzedModule {
    let mut functions = Vec::new();
    let mut classes = Vec::new();
    let mut imports = Vec::new();
    let mut globals = Vec::new();

    for stmt in body {
        match stmt {
            Stmt::FunctionDef(def) => functions.push(function_info(def)),
            Stmt::ClassDef(def) => classes.push(class_info(def)),
            Stmt::Import { names, line } => {
                imports.extend(names.iter().map(|alias| ImportInfo {
                    module: alias.name.clone(),
                    alias: alias.asname.map(str::to_string),
                    line: *line,
                }));
            }
            Stmt::ImportFrom {
                module,
                level,
                names,
                line,
            } => {
                let base = format!("{}{}", ".".repeat(*level), module.as_deref().unwrap_or(""));
                imports.extend(names.iter().map(|alias| ImportInfo {
                    module: qualified_import(&base, alias),
                    alias: alias.asname.map(str::to_string),
                    line: *line,
                }));
            }
            Stmt::Assign { .. } => globals.extend(simple_assignment(stmt)),
            Stmt::Expr { .. } | Stmt::Other { .. } => {}
        }
    }

    let metrics = ModuleMetrics {
        lines_of_code: source.lines().count(),
        function_count: functions.len(),
        class_count: classes.len(),
        import_count: imports.len(),
    };

    AnalyzedModule {
        file_path: file_path.to_string(),
        module_docstring: ast::docstring(body),
        functions,
        classes,
        imports,
        globals,
        metrics,
    }
}

/// `from <base> import <name>` as one dotted path.
///
/// A bare relative base (`.` or `..`) is joined without an extra dot.
fn qualified_import(base: &str, alias: &Alias<'_>) -> String {
    if base.is_empty() {
        alias.name.clone()
    } else if base.ends_with('.') {
        format!("{}{}", base, alias.name)
    } else {
        format!("{}.{}", base, alias.name)
    }
}

fn function_info(def: &FunctionDef<'_>) -> FunctionInfo {
    let parameters = def
        .params
        .iter()
        .map(|param| ParameterSpec {
            name: param.name.to_string(),
            type_annotation: param.annotation.as_ref().map(ToString::to_string),
            kind: param.kind,
        })
        .collect();

    let default_values = def
        .params
        .iter()
        .filter(|param| param.kind.is_positional())
        .filter_map(|param| param.default.as_ref().map(ToString::to_string))
        .collect();

    FunctionInfo {
        name: def.name.to_string(),
        parameters,
        default_values,
        return_type: def.returns.as_ref().map(ToString::to_string),
        decorators: def.decorators.iter().map(ToString::to_string).collect(),
        docstring: ast::docstring(&def.body),
        is_async: def.is_async,
        start_line: def.line,
        end_line: Some(def.end_line),
    }
}

fn class_info(def: &ClassDef<'_>) -> ClassInfo {
    let base_classes = def
        .args
        .iter()
        .filter_map(|arg| match arg {
            Arg::Positional(expr) => Some(expr.to_string()),
            Arg::Keyword(..) => None,
        })
        .collect();

    let mut methods = Vec::new();
    let mut attributes = Vec::new();
    for stmt in &def.body {
        match stmt {
            Stmt::FunctionDef(method) => methods.push(function_info(method)),
            Stmt::Assign { .. } => attributes.extend(simple_assignment(stmt)),
            _ => {}
        }
    }

    ClassInfo {
        name: def.name.to_string(),
        base_classes,
        methods,
        attributes,
        docstring: ast::docstring(&def.body),
        start_line: def.line,
        end_line: Some(def.end_line),
    }
}

/// `name = value` with exactly one plain-name target.
fn simple_assignment(stmt: &Stmt<'_>) -> Option<AttributeInfo> {
    let Stmt::Assign {
        targets,
        value,
        line,
    } = stmt
    else {
        return None;
    };
    match targets.as_slice() {
        [target] => match target.unparenthesized() {
            Expr::Name(name) => Some(AttributeInfo {
                name: name.to_string(),
                value_expr: Some(value.to_string()),
                line: *line,
            }),
            _ => None,
        },
        _ => None,
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Render a plain-text snippet of the source around a syntax error.
fn render_diagnostic(source: &str, file_path: &str, err: &ParserError) -> String {
    let line = (err.line() as usize).max(1);
    let first_line = line.saturating_sub(DIAGNOSTIC_CONTEXT).max(1);
    let start_offset = line_offset(source, first_line);
    let end_offset = line_offset(source, line + DIAGNOSTIC_CONTEXT + 1).max(start_offset);
    let window = &source[start_offset..end_offset];

    let start = err.offset().clamp(start_offset, end_offset) - start_offset;
    let end = window
        .get(start..)
        .and_then(|rest| rest.chars().next())
        .map_or(start + 1, |c| start + c.len_utf8());

    let label = err.label();
    let message = Level::Error.title(&label).snippet(
        Snippet::source(window)
            .line_start(first_line)
            .origin(file_path)
            .fold(false)
            .annotation(Level::Error.span(start..end).label(&label)),
    );
    let rendered = Renderer::plain().render(message).to_string();
    rendered
}

/// Byte offset where 1-based `line` begins, or the source length past the end.
fn line_offset(source: &str, line: usize) -> usize {
    if line <= 1 {
        return 0;
    }
    memchr::memchr_iter(b'\n', source.as_bytes())
        .nth(line - 2)
        .map_or(source.len(), |idx| idx + 1)
}

// ============================================================================
// Tests
// ============================================================================
