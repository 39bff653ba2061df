// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use codescope_core::model::ParamKind;

use super::ast::{Arg, Expr, Stmt};
use super::{parse_module, ParserError};

fn parse_ok(src: &str) -> Vec<Stmt<'_>> {
    match parse_module(src) {
        Ok(module) => module.body,
        Err(e) => panic!("failed to parse {:?}: {}", src, e),
    }
}

fn parse_err(src: &str) -> ParserError {
    match parse_module(src) {
        Ok(_) => panic!("expected a syntax error for {:?}", src),
        Err(e) => e,
    }
}

/// Re-serialize the value of a single `x = <expr>` statement.
fn unparse_value(src: &str) -> String {
    match &parse_ok(src)[0] {
        Stmt::Assign { value, .. } => value.to_string(),
        other => panic!("expected assignment, got {:?}", other),
    }
}

mod statements {
    use super::*;

    #[test]
    fn test_top_level_kinds() {
        let body = parse_ok(
            "\"\"\"Doc.\"\"\"\nimport os\nfrom a import b\nX = 1\n\ndef f():\n    pass\n\nclass C:\n    pass\nif X:\n    pass\n",
        );
        assert!(matches!(body[0], Stmt::Expr { .. }));
        assert!(matches!(body[1], Stmt::Import { .. }));
        assert!(matches!(body[2], Stmt::ImportFrom { .. }));
        assert!(matches!(body[3], Stmt::Assign { .. }));
        assert!(matches!(body[4], Stmt::FunctionDef(_)));
        assert!(matches!(body[5], Stmt::ClassDef(_)));
        assert!(matches!(body[6], Stmt::Other { line: 11 }));
    }

    #[test]
    fn test_semicolon_separated() {
        let body = parse_ok("a = 1; b = 2; pass\n");
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn test_function_details() {
        let body = parse_ok(
            "@cache\n@app.route('/x', methods=['GET'])\nasync def fetch(self, a: int, /, b=2, *args, c, d: str = 'x', **kw) -> dict[str, int]:\n    '''Doc.'''\n    return {}\n",
        );
        let Stmt::FunctionDef(func) = &body[0] else {
            panic!("expected function");
        };
        assert_eq!(func.name, "fetch");
        assert!(func.is_async);
        assert_eq!(func.line, 3);
        assert_eq!(func.end_line, 5);
        let decorators: Vec<String> = func.decorators.iter().map(|d| d.to_string()).collect();
        assert_eq!(decorators, vec!["cache", "app.route('/x', methods=['GET'])"]);
        let kinds: Vec<ParamKind> = func.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::PositionalOnly,
                ParamKind::PositionalOnly,
                ParamKind::Regular,
                ParamKind::VarArgs,
                ParamKind::KeywordOnly,
                ParamKind::KeywordOnly,
                ParamKind::Kwargs,
            ]
        );
        assert_eq!(func.returns.as_ref().unwrap().to_string(), "dict[str, int]");
    }

    #[test]
    fn test_class_details() {
        let body = parse_ok("class A(Base, mixins.M, metaclass=Meta):\n    x = 1\n\n    def m(self):\n        pass\n");
        let Stmt::ClassDef(class) = &body[0] else {
            panic!("expected class");
        };
        assert_eq!(class.name, "A");
        assert_eq!(class.args.len(), 3);
        assert!(matches!(class.args[2], Arg::Keyword("metaclass", _)));
        assert_eq!(class.body.len(), 2);
        assert_eq!(class.end_line, 5);
    }

    #[test]
    fn test_compound_statements() {
        parse_ok(
            "for i, (a, b) in enumerate(x):\n    continue\nelse:\n    pass\nwhile not done:\n    break\ntry:\n    pass\nexcept (A, B) as e:\n    raise X from e\nexcept C:\n    pass\nelse:\n    pass\nfinally:\n    pass\nwith open(p) as f, lock:\n    pass\nwith (open(a) as f,\n      open(b) as g):\n    pass\n",
        );
    }

    #[test]
    fn test_match_statement_and_soft_keyword() {
        parse_ok(
            "match command.split():\n    case [action]:\n        pass\n    case {'k': v} if v > 0:\n        pass\n    case _:\n        pass\n",
        );
        let body = parse_ok("match = 1\nmatch(x)\ntype = 2\ntype Alias = list[int]\n");
        assert!(matches!(body[0], Stmt::Assign { .. }));
        assert!(matches!(body[1], Stmt::Expr { .. }));
        assert!(matches!(body[2], Stmt::Assign { .. }));
        assert!(matches!(body[3], Stmt::Other { .. }));
    }

    #[test]
    fn test_import_forms() {
        let body = parse_ok("import a.b as c, d\nfrom ..pkg import (x as y,\n    z,)\nfrom . import *\n");
        let Stmt::Import { names, .. } = &body[0] else {
            panic!("expected import");
        };
        assert_eq!(names[0].name, "a.b");
        assert_eq!(names[0].asname, Some("c"));
        let Stmt::ImportFrom {
            module,
            level,
            names,
            ..
        } = &body[1]
        else {
            panic!("expected from-import");
        };
        assert_eq!(module.as_deref(), Some("pkg"));
        assert_eq!(*level, 2);
        assert_eq!(names.len(), 2);
        let Stmt::ImportFrom { module, names, .. } = &body[2] else {
            panic!("expected star import");
        };
        assert!(module.is_none());
        assert_eq!(names[0].name, "*");
    }

    #[test]
    fn test_assignment_forms() {
        let body = parse_ok("a = b = 1\nx, *y = z\nobj.attr = 2\nn: int = 3\nn += 1\nd['k'] = 4\n");
        let Stmt::Assign { targets, .. } = &body[0] else {
            panic!("expected assignment");
        };
        assert_eq!(targets.len(), 2);
        assert!(matches!(body[3], Stmt::Other { .. }));
        assert!(matches!(body[4], Stmt::Other { .. }));
    }
}

mod unparse {
    use super::*;

    #[test]
    fn test_spacing_is_normalized() {
        assert_eq!(unparse_value("x = a+b*  c\n"), "a + b * c");
        assert_eq!(unparse_value("x = -1\n"), "-1");
        assert_eq!(unparse_value("x = not  a\n"), "not a");
        assert_eq!(unparse_value("x = f( a,b = 2 )\n"), "f(a, b=2)");
        assert_eq!(unparse_value("x = {'a':1,**rest}\n"), "{'a': 1, **rest}");
    }

    #[test]
    fn test_source_parentheses_are_kept() {
        assert_eq!(unparse_value("x = (a + b) * c\n"), "(a + b) * c");
        assert_eq!(unparse_value("x = (1,)\n"), "(1,)");
        assert_eq!(unparse_value("x = ()\n"), "()");
    }

    #[test]
    fn test_compound_expressions() {
        assert_eq!(unparse_value("x = a if b else c\n"), "a if b else c");
        assert_eq!(unparse_value("x = lambda a, *, b=1: a\n"), "lambda a, *, b=1: a");
        assert_eq!(
            unparse_value("x = [i*2 for i in range(10) if i]\n"),
            "[i * 2 for i in range(10) if i]"
        );
        assert_eq!(unparse_value("x = {k: v for k, v in items}\n"), "{k: v for k, v in items}");
        assert_eq!(unparse_value("x = a[1:2, ::3]\n"), "a[1:2, ::3]");
        assert_eq!(unparse_value("x = a is not None and b not in c\n"), "a is not None and b not in c");
        assert_eq!(unparse_value("x = 'a' 'b'\n"), "'a' 'b'");
        assert_eq!(unparse_value("x = await fut\n"), "await fut");
        assert_eq!(unparse_value("x = sum(i for i in y)\n"), "sum(i for i in y)");
    }

    #[test]
    fn test_tuple_without_parens() {
        assert_eq!(unparse_value("x = 1, 2\n"), "1, 2");
        assert_eq!(unparse_value("x = 1,\n"), "1,");
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_missing_colon() {
        let err = parse_err("def f()\n    pass\n");
        assert_eq!(err.line(), 1);
        assert!(err.label().contains("':'"), "{}", err);
    }

    #[test]
    fn test_python2_print() {
        let err = parse_err("print \"hello\"\n");
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_unexpected_indent() {
        let err = parse_err("x = 1\n    y = 2\n");
        assert_eq!(err.label(), "unexpected indent");
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_missing_block() {
        let err = parse_err("if x:\npass\n");
        assert_eq!(err.label(), "expected an indented block");
    }

    #[test]
    fn test_invalid_targets() {
        assert!(parse_err("f() = 1\n").label().contains("function call"));
        assert!(parse_err("1 = x\n").label().contains("literal"));
        assert!(parse_err("a + b += 1\n").label().contains("augmented"));
    }

    #[test]
    fn test_parameter_rules() {
        assert!(parse_err("def f(a=1, b):\n    pass\n")
            .label()
            .contains("without a default"));
        assert!(parse_err("def f(*):\n    pass\n").label().contains("bare *"));
        assert!(parse_err("def f(**kw, a):\n    pass\n")
            .label()
            .contains("var-keyword"));
        assert!(parse_err("def f(a, a):\n    pass\n").label().contains("duplicate"));
    }

    #[test]
    fn test_keyword_as_name() {
        parse_err("class = 1\n");
        parse_err("def import():\n    pass\n");
    }

    #[test]
    fn test_try_without_handlers() {
        let err = parse_err("try:\n    pass\nx = 1\n");
        assert!(err.label().contains("except"));
    }

    #[test]
    fn test_tokenizer_error_is_reported() {
        let err = parse_err("x = (1,\n");
        assert!(matches!(err, ParserError::TokenizerError { .. }));
        assert_eq!(err.offset(), 4);
    }

    #[test]
    fn test_unterminated_call() {
        parse_err("foo(a b)\n");
        parse_err("x = [1 2]\n");
    }

    #[test]
    fn test_positional_after_keyword() {
        let err = parse_err("f(a=1, b)\n");
        assert!(err.label().contains("positional argument"));
    }
}

#[test]
fn test_expr_helpers() {
    let body = parse_ok("(x) = 1\n");
    let Stmt::Assign { targets, .. } = &body[0] else {
        panic!("expected assignment");
    };
    assert!(matches!(targets[0].unparenthesized(), Expr::Name("x")));
}
