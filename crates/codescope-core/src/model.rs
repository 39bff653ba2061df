//! Structural model types shared by every pipeline stage.
//!
//! The analyzer produces these records, the test generator and the report
//! assembler consume them. They serialize to the JSON records exchanged between
//! stages, so field names are part of the contract.
//!
//! ## Two-shape records
//!
//! [`ModuleAnalysis`] is either a full structural record or a failure record
//! carrying only `file_path` and `error`. The enum is untagged on the wire: a
//! record with an `error` field decodes as [`ModuleAnalysis::Failed`], anything
//! else must carry the full structural fields.

use serde::{Deserialize, Serialize};

// ============================================================================
// Parameters and Functions
// ============================================================================

/// Parameter kind classification for Python signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Standard named parameter.
    #[default]
    Regular,
    /// Positional-only parameter (before `/`).
    PositionalOnly,
    /// Variadic positional parameter (`*args`).
    VarArgs,
    /// Keyword-only parameter (after `*` or `*args`).
    KeywordOnly,
    /// Variadic keyword parameter (`**kwargs`).
    Kwargs,
}

impl ParamKind {
    /// Returns true for parameters that can be filled positionally by name.
    pub fn is_positional(&self) -> bool {
        matches!(self, ParamKind::Regular | ParamKind::PositionalOnly)
    }

    /// Prefix used when rendering the parameter in a signature.
    pub fn prefix(&self) -> &'static str {
        match self {
            ParamKind::VarArgs => "*",
            ParamKind::Kwargs => "**",
            _ => "",
        }
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default)]
    pub kind: ParamKind,
}

impl ParameterSpec {
    /// Create a regular parameter without annotation.
    pub fn new(name: impl Into<String>) -> Self {
        ParameterSpec {
            name: name.into(),
            type_annotation: None,
            kind: ParamKind::Regular,
        }
    }
}

/// A function or method definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Re-serialized default expressions of the positional parameters, in order.
    #[serde(default)]
    pub default_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub is_async: bool,
    pub start_line: u32,
    #[serde(default)]
    pub end_line: Option<u32>,
}

impl FunctionInfo {
    /// Names starting with an underscore are private (this includes dunders).
    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }

    /// Positional parameters, excluding any parameter literally named `self`.
    pub fn positional_args(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters
            .iter()
            .filter(|p| p.kind.is_positional() && p.name != "self")
    }

    /// Render the parameter list as `a, b, *args, **kwargs`.
    pub fn signature_params(&self) -> String {
        self.parameters
            .iter()
            .map(|p| format!("{}{}", p.kind.prefix(), p.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Classes and Attributes
// ============================================================================

/// A simple single-target assignment at module or class level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    #[serde(default)]
    pub value_expr: Option<String>,
    pub line: u32,
}

/// A class definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    #[serde(default)]
    pub base_classes: Vec<String>,
    #[serde(default)]
    pub methods: Vec<FunctionInfo>,
    #[serde(default)]
    pub attributes: Vec<AttributeInfo>,
    #[serde(default)]
    pub docstring: Option<String>,
    pub start_line: u32,
    #[serde(default)]
    pub end_line: Option<u32>,
}

impl ClassInfo {
    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }
}

// ============================================================================
// Imports
// ============================================================================

/// One imported name. From-imports are qualified with their source module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub line: u32,
}

// ============================================================================
// Module Analysis
// ============================================================================

/// Size metrics of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleMetrics {
    pub lines_of_code: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub import_count: usize,
}

/// Full structural record of a successfully parsed module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzedModule {
    pub file_path: String,
    pub module_docstring: Option<String>,
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub imports: Vec<ImportInfo>,
    pub globals: Vec<AttributeInfo>,
    pub metrics: ModuleMetrics,
}

/// Failure record of a module that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailedModule {
    pub file_path: String,
    pub error: String,
    /// Rendered source snippet pointing at the failure, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// Analysis outcome for one module: structural record or failure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleAnalysis {
    Failed(FailedModule),
    Analyzed(AnalyzedModule),
}

impl ModuleAnalysis {
    /// Create a failure record.
    pub fn failed(file_path: impl Into<String>, error: impl Into<String>) -> Self {
        ModuleAnalysis::Failed(FailedModule {
            file_path: file_path.into(),
            error: error.into(),
            diagnostic: None,
        })
    }

    pub fn file_path(&self) -> &str {
        match self {
            ModuleAnalysis::Failed(m) => &m.file_path,
            ModuleAnalysis::Analyzed(m) => &m.file_path,
        }
    }

    /// Returns the structural record, or None for failure records.
    pub fn as_analyzed(&self) -> Option<&AnalyzedModule> {
        match self {
            ModuleAnalysis::Analyzed(m) => Some(m),
            ModuleAnalysis::Failed(_) => None,
        }
    }

    /// Returns the error message, or None for structural records.
    pub fn error(&self) -> Option<&str> {
        match self {
            ModuleAnalysis::Failed(m) => Some(&m.error),
            ModuleAnalysis::Analyzed(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ModuleAnalysis::Failed(_))
    }
}

/// Stage input that may be a single record or a list of records.
///
/// Decoding accepts both `{...}` and `[{...}, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisBatch {
    Many(Vec<ModuleAnalysis>),
    One(Box<ModuleAnalysis>),
}

impl AnalysisBatch {
    /// Flatten into a list of records.
    pub fn into_vec(self) -> Vec<ModuleAnalysis> {
        match self {
            AnalysisBatch::Many(v) => v,
            AnalysisBatch::One(m) => vec![*m],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_function(name: &str, params: &[&str]) -> FunctionInfo {
        FunctionInfo {
            name: name.to_string(),
            parameters: params.iter().map(|p| ParameterSpec::new(*p)).collect(),
            default_values: vec![],
            return_type: None,
            decorators: vec![],
            docstring: None,
            is_async: false,
            start_line: 1,
            end_line: Some(2),
        }
    }

    mod module_analysis_shapes {
        use super::*;

        #[test]
        fn failure_record_decodes_as_failed() {
            let json = r#"{"file_path": "bad.py", "error": "Syntax error in bad.py"}"#;
            let analysis: ModuleAnalysis = serde_json::from_str(json).unwrap();
            assert!(analysis.is_error());
            assert_eq!(analysis.error(), Some("Syntax error in bad.py"));
            assert_eq!(analysis.file_path(), "bad.py");
        }

        #[test]
        fn failure_record_serializes_without_structural_fields() {
            let analysis = ModuleAnalysis::failed("bad.py", "boom");
            let json = serde_json::to_string(&analysis).unwrap();
            assert!(json.contains("\"error\":\"boom\""));
            assert!(!json.contains("functions"));
            assert!(!json.contains("classes"));
        }

        #[test]
        fn structural_record_round_trips() {
            let analysis = ModuleAnalysis::Analyzed(AnalyzedModule {
                file_path: "pkg/mod.py".to_string(),
                module_docstring: Some("Doc.".to_string()),
                functions: vec![sample_function("get_x", &[])],
                classes: vec![],
                imports: vec![],
                globals: vec![],
                metrics: ModuleMetrics {
                    lines_of_code: 3,
                    function_count: 1,
                    class_count: 0,
                    import_count: 0,
                },
            });
            let json = serde_json::to_string(&analysis).unwrap();
            assert!(!json.contains("\"error\""));
            let back: ModuleAnalysis = serde_json::from_str(&json).unwrap();
            assert_eq!(back, analysis);
        }

        #[test]
        fn record_with_both_shapes_is_rejected() {
            let json = r#"{"file_path": "x.py", "error": "e", "functions": []}"#;
            assert!(serde_json::from_str::<ModuleAnalysis>(json).is_err());
        }
    }

    mod batch_decoding {
        use super::*;

        #[test]
        fn single_record_becomes_one_element() {
            let json = r#"{"file_path": "bad.py", "error": "e"}"#;
            let batch: AnalysisBatch = serde_json::from_str(json).unwrap();
            assert_eq!(batch.into_vec().len(), 1);
        }

        #[test]
        fn list_of_records_is_preserved() {
            let json = r#"[{"file_path": "a.py", "error": "e"}, {"file_path": "b.py", "error": "f"}]"#;
            let batch: AnalysisBatch = serde_json::from_str(json).unwrap();
            let modules = batch.into_vec();
            assert_eq!(modules.len(), 2);
            assert_eq!(modules[1].file_path(), "b.py");
        }
    }

    mod function_helpers {
        use super::*;

        #[test]
        fn positional_args_skip_self_and_keyword_only() {
            let mut func = sample_function("method", &["self", "a", "b"]);
            func.parameters.push(ParameterSpec {
                name: "c".to_string(),
                type_annotation: None,
                kind: ParamKind::KeywordOnly,
            });
            let names: Vec<_> = func.positional_args().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
        }

        #[test]
        fn signature_params_render_star_prefixes() {
            let mut func = sample_function("f", &["a"]);
            func.parameters.push(ParameterSpec {
                name: "args".to_string(),
                type_annotation: None,
                kind: ParamKind::VarArgs,
            });
            func.parameters.push(ParameterSpec {
                name: "kwargs".to_string(),
                type_annotation: None,
                kind: ParamKind::Kwargs,
            });
            assert_eq!(func.signature_params(), "a, *args, **kwargs");
        }

        #[test]
        fn underscore_names_are_private() {
            assert!(!sample_function("_helper", &[]).is_public());
            assert!(!sample_function("__init__", &[]).is_public());
            assert!(sample_function("run", &[]).is_public());
        }
    }
}
