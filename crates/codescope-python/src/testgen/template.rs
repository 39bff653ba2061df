//! Rendering of pytest skeleton files.

use codescope_core::model::{AnalyzedModule, ClassInfo, FunctionInfo};

use super::heuristics::{select_stub, StubKind, FUNCTION_BUCKETS, METHOD_BUCKETS};
use crate::parser::is_keyword;

/// Render the complete test file for one analyzed module.
pub fn render_test_file(module: &AnalyzedModule) -> String {
    let mut out = format!(
        "# Generated test file for {}\nimport pytest\nfrom {} import *\n",
        module.file_path,
        import_path(&module.file_path)
    );
    for func in module.functions.iter().filter(|f| f.is_public()) {
        out.push_str(&function_test(func));
    }
    for class in module.classes.iter().filter(|c| c.is_public()) {
        out.push_str(&class_test(class));
    }
    out
}

/// Dotted import path for a relative module path.
///
/// Separators become dots and the `.py` suffix is dropped. Each segment is
/// forced into a valid identifier so the import line always parses.
pub fn import_path(file_path: &str) -> String {
    let normalized = file_path.replace('\\', "/");
    let stem = normalized.strip_suffix(".py").unwrap_or(&normalized);
    let segments: Vec<String> = stem
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .map(identifier)
        .collect();
    if segments.is_empty() {
        "module".to_string()
    } else {
        segments.join(".")
    }
}

fn identifier(segment: &str) -> String {
    let mut ident: String = segment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if is_keyword(&ident) {
        ident.push('_');
    }
    ident
}

fn placeholder_args(func: &FunctionInfo, kind: StubKind) -> String {
    func.positional_args()
        .map(|_| kind.placeholder())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Body lines for one stub, each prefixed by `indent`.
fn stub_body(kind: StubKind, call: &str, name: &str, indent: &str) -> String {
    match kind {
        StubKind::ReturnsValue => format!(
            "{indent}result = {call}\n{indent}assert result is not None, \"Should return a value\"\n"
        ),
        StubKind::ReturnsBool => format!(
            "{indent}result = {call}\n{indent}assert isinstance(result, bool), \"Should return a boolean\"\n"
        ),
        StubKind::Calculates => format!(
            "{indent}result = {call}\n{indent}assert result is not None, \"Should return a calculated value\"\n"
        ),
        StubKind::Todo => format!(
            "{indent}# TODO: Add proper test parameters\n{indent}result = {call}\n{indent}# TODO: Add appropriate assertions for {name}\n"
        ),
    }
}

fn function_test(func: &FunctionInfo) -> String {
    let kind = select_stub(&func.name, FUNCTION_BUCKETS);
    let call = format!("{}({})", func.name, placeholder_args(func, kind));
    format!(
        "\n\ndef test_{name}():\n    \"\"\"Test the {name} function.\"\"\"\n{body}",
        name = func.name,
        body = stub_body(kind, &call, &func.name, "    ")
    )
}

fn class_test(class: &ClassInfo) -> String {
    let fixture = format!("{}_instance", class.name.to_lowercase());
    let mut out = format!(
        "\n\nclass Test{name}:\n    @pytest.fixture\n    def {fixture}(self):\n        \"\"\"{name} instance for testing.\"\"\"\n        return {name}()\n",
        name = class.name,
    );
    for method in class.methods.iter().filter(|m| m.is_public()) {
        let kind = select_stub(&method.name, METHOD_BUCKETS);
        let call = format!(
            "{}.{}({})",
            fixture,
            method.name,
            placeholder_args(method, kind)
        );
        out.push_str(&format!(
            "\n    def test_{name}(self, {fixture}):\n        \"\"\"Test the {name} method.\"\"\"\n{body}",
            name = method.name,
            body = stub_body(kind, &call, &method.name, "        ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codescope_core::model::{ModuleMetrics, ParamKind, ParameterSpec};

    fn func(name: &str, params: &[&str]) -> FunctionInfo {
        FunctionInfo {
            name: name.to_string(),
            parameters: params.iter().map(|p| ParameterSpec::new(*p)).collect(),
            default_values: vec![],
            return_type: None,
            decorators: vec![],
            docstring: None,
            is_async: false,
            start_line: 1,
            end_line: None,
        }
    }

    fn class(name: &str, methods: Vec<FunctionInfo>) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            base_classes: vec![],
            methods,
            attributes: vec![],
            docstring: None,
            start_line: 1,
            end_line: None,
        }
    }

    fn module(functions: Vec<FunctionInfo>, classes: Vec<ClassInfo>) -> AnalyzedModule {
        AnalyzedModule {
            file_path: "app/utils.py".to_string(),
            module_docstring: None,
            functions,
            classes,
            imports: vec![],
            globals: vec![],
            metrics: ModuleMetrics::default(),
        }
    }

    #[test]
    fn header_imports_module() {
        let out = render_test_file(&module(vec![], vec![]));
        assert_eq!(
            out,
            "# Generated test file for app/utils.py\nimport pytest\nfrom app.utils import *\n"
        );
    }

    #[test]
    fn getter_asserts_not_none() {
        let out = function_test(&func("get_x", &[]));
        assert_eq!(
            out,
            "\n\ndef test_get_x():\n    \"\"\"Test the get_x function.\"\"\"\n    result = get_x()\n    assert result is not None, \"Should return a value\"\n"
        );
    }

    #[test]
    fn calculation_uses_zero_placeholders() {
        let out = function_test(&func("calculate_total", &["a", "b"]));
        assert!(out.contains("result = calculate_total(0, 0)\n"));
        assert!(out.contains("Should return a calculated value"));
    }

    #[test]
    fn default_bucket_leaves_todo_markers() {
        let out = function_test(&func("process", &["data"]));
        assert!(out.contains("    # TODO: Add proper test parameters\n    result = process(None)\n"));
        assert!(out.contains("# TODO: Add appropriate assertions for process"));
        assert!(!out.contains("assert "));
    }

    #[test]
    fn placeholders_skip_self_and_non_positional() {
        let mut f = func("check", &["self", "a"]);
        f.parameters.push(ParameterSpec {
            name: "rest".to_string(),
            type_annotation: None,
            kind: ParamKind::VarArgs,
        });
        assert_eq!(placeholder_args(&f, StubKind::ReturnsBool), "None");
    }

    #[test]
    fn class_gets_fixture_and_public_method_stubs() {
        let c = class(
            "UserStore",
            vec![
                func("__init__", &["self"]),
                func("fetch_user", &["self", "user_id"]),
                func("is_empty", &["self"]),
                func("_cache", &["self"]),
                func("compute", &["self"]),
            ],
        );
        let out = class_test(&c);
        assert!(out.starts_with("\n\nclass TestUserStore:\n    @pytest.fixture\n    def userstore_instance(self):\n"));
        assert!(out.contains("        return UserStore()\n"));
        assert!(out.contains("    def test_fetch_user(self, userstore_instance):\n"));
        assert!(out.contains("        result = userstore_instance.fetch_user(None)\n"));
        assert!(out.contains("assert isinstance(result, bool)"));
        assert!(out.contains("# TODO: Add appropriate assertions for compute"));
        assert!(!out.contains("test___init__"));
        assert!(!out.contains("test__cache"));
    }

    #[test]
    fn private_symbols_are_skipped() {
        let out = render_test_file(&module(
            vec![func("_helper", &[]), func("run", &[])],
            vec![class("_Internal", vec![])],
        ));
        assert!(!out.contains("_helper"));
        assert!(out.contains("def test_run()"));
        assert!(!out.contains("Test_Internal"));
    }

    #[test]
    fn import_path_sanitizes_segments() {
        assert_eq!(import_path("pkg/sub/mod.py"), "pkg.sub.mod");
        assert_eq!(import_path("pkg\\win.py"), "pkg.win");
        assert_eq!(import_path("my-app/2fa.py"), "my_app._2fa");
        assert_eq!(import_path("class/import.py"), "class_.import_");
        assert_eq!(import_path("pkg/__init__.py"), "pkg.__init__");
    }
}
