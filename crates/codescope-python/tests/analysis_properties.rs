//! End-to-end properties of collection, analysis and test generation.
//!
//! Each test builds a scratch project in a temp directory and runs the Python
//! stages over it the way the CLI does.

use std::fs;
use std::path::Path;

use codescope_core::model::ModuleAnalysis;
use codescope_python::analyzer::{analyze_collection, analyze_source};
use codescope_python::files::collect_python_files;
use codescope_python::testgen::generate_tests;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "app/models.py",
        "\"\"\"Domain models.\"\"\"\n\nclass Account(Base):\n    kind = 'basic'\n\n    def __init__(self, owner):\n        self.owner = owner\n\n    def get_owner(self):\n        return self.owner\n\n    def is_active(self):\n        return True\n\n    def close(self, reason='done'):\n        pass\n",
    );
    write(
        root,
        "app/math_utils.py",
        "from functools import reduce\n\ndef calculate_total(items, tax=0):\n    return sum(items) + tax\n\ndef has_items(items):\n    return bool(items)\n\ndef _private():\n    pass\n\nasync def fetch_rates(client, *, currency='EUR', **opts):\n    return await client.get(currency)\n",
    );
    write(root, "app/broken.py", "def oops(:\n    return\n");
    write(root, "main.py", "import sys\nfrom app import models\n\nVERSION = '1.0'\n\ndef main(argv=None):\n    return 0\n");
    write(root, "README.md", "not python");
    dir
}

#[test]
fn collect_then_analyze_preserves_cardinality() {
    let project = sample_project();
    let collection = collect_python_files(project.path()).unwrap();
    let files = collection.files().unwrap();
    assert_eq!(files.len(), 4);

    let analyses = analyze_collection(&collection);
    assert_eq!(analyses.len(), files.len());
    let paths: Vec<_> = analyses.iter().map(ModuleAnalysis::file_path).collect();
    let keys: Vec<_> = files.keys().map(String::as_str).collect();
    assert_eq!(paths, keys);
    assert_eq!(analyses.iter().filter(|a| a.is_error()).count(), 1);
}

#[test]
fn getter_function_gets_not_none_stub() {
    let dir = TempDir::new().unwrap();
    let analysis = analyze_source("def get_x():\n    ...\n", "pkg/getters.py");
    let manifest = generate_tests(&[analysis], dir.path()).unwrap();
    assert_eq!(manifest.file_count, 1);

    let content = fs::read_to_string(dir.path().join("test_getters.py")).unwrap();
    assert!(content.contains("from pkg.getters import *\n"));
    assert!(content.contains("    result = get_x()\n    assert result is not None"));
    assert!(!content.contains("TODO"));
}

#[test]
fn invalid_file_yields_error_record() {
    let analysis = analyze_source("class :\n", "bad.py");
    assert!(analysis.is_error());
    let value = serde_json::to_value(&analysis).unwrap();
    let record = value.as_object().unwrap();
    assert!(record.contains_key("error"));
    assert!(!record.contains_key("functions"));
    assert!(!record.contains_key("classes"));
}

#[test]
fn generated_files_parse_cleanly() {
    let project = sample_project();
    let out = TempDir::new().unwrap();
    let collection = collect_python_files(project.path()).unwrap();
    let analyses = analyze_collection(&collection);

    let manifest = generate_tests(&analyses, out.path()).unwrap();
    assert_eq!(manifest.file_count, 3);
    assert_eq!(manifest.skipped.len(), 1);

    for path in &manifest.generated_test_files {
        let source = fs::read_to_string(path).unwrap();
        let reparsed = analyze_source(&source, path);
        assert!(
            !reparsed.is_error(),
            "{} does not parse: {:?}\n{}",
            path,
            reparsed.error(),
            source
        );
    }

    let models = fs::read_to_string(out.path().join("test_models.py")).unwrap();
    assert!(models.contains("class TestAccount:"));
    assert!(models.contains("result = account_instance.get_owner()\n"));
    assert!(models.contains("result = account_instance.close(None)\n"));
    assert!(!models.contains("test___init__"));

    let math = fs::read_to_string(out.path().join("test_math_utils.py")).unwrap();
    assert!(math.contains("result = calculate_total(0, 0)\n"));
    assert!(math.contains("result = has_items(None)\n"));
    assert!(math.contains("result = fetch_rates(None)\n"));
    assert!(!math.contains("_private"));
}

#[test]
fn generated_test_module_structure_is_analyzable() {
    let out = TempDir::new().unwrap();
    let analysis = analyze_source(
        "class Cart:\n    def get_total(self):\n        return 0\n\ndef check_out(cart):\n    pass\n",
        "shop.py",
    );
    let manifest = generate_tests(&[analysis], out.path()).unwrap();
    let source = fs::read_to_string(&manifest.generated_test_files[0]).unwrap();
    let reparsed = analyze_source(&source, "test_shop.py");
    let module = reparsed.as_analyzed().unwrap();

    let functions: Vec<_> = module.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(functions, vec!["test_check_out"]);
    assert_eq!(module.classes[0].name, "TestCart");
    let methods: Vec<_> = module.classes[0].methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["cart_instance", "test_get_total"]);
    assert_eq!(module.classes[0].methods[0].decorators, vec!["pytest.fixture"]);
}
