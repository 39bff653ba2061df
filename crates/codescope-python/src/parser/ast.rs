// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Syntax tree produced by the parser.
//!
//! Expressions are kept in full so they can be re-serialized with [`Display`]
//! (normalized spacing, source parentheses preserved). Statements the analyzer
//! does not inspect are validated during parsing but reduced to
//! [`Stmt::Other`].

use std::fmt::{self, Display};

use codescope_core::model::ParamKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Module<'a> {
    pub body: Vec<Stmt<'a>>,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    FunctionDef(FunctionDef<'a>),
    ClassDef(ClassDef<'a>),
    Import {
        names: Vec<Alias<'a>>,
        line: u32,
    },
    ImportFrom {
        /// Dotted module path without leading dots, if any.
        module: Option<String>,
        /// Number of leading dots.
        level: usize,
        names: Vec<Alias<'a>>,
        line: u32,
    },
    Assign {
        targets: Vec<Expr<'a>>,
        value: Expr<'a>,
        line: u32,
    },
    Expr {
        value: Expr<'a>,
        line: u32,
    },
    /// Any other statement, simple or compound.
    Other {
        line: u32,
    },
}

impl Stmt<'_> {
    pub fn line(&self) -> u32 {
        match self {
            Stmt::FunctionDef(f) => f.line,
            Stmt::ClassDef(c) => c.line,
            Stmt::Import { line, .. }
            | Stmt::ImportFrom { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::Expr { line, .. }
            | Stmt::Other { line } => *line,
        }
    }
}

/// `name` or `name as asname` in an import statement. `name` is `*` for a star
/// import.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias<'a> {
    pub name: String,
    pub asname: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef<'a> {
    pub name: &'a str,
    pub params: Vec<Param<'a>>,
    pub returns: Option<Expr<'a>>,
    pub decorators: Vec<Expr<'a>>,
    pub body: Vec<Stmt<'a>>,
    pub is_async: bool,
    pub line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef<'a> {
    pub name: &'a str,
    pub args: Vec<Arg<'a>>,
    pub decorators: Vec<Expr<'a>>,
    pub body: Vec<Stmt<'a>>,
    pub line: u32,
    pub end_line: u32,
}

/// A declared parameter of a `def` or `lambda`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param<'a> {
    pub name: &'a str,
    pub annotation: Option<Expr<'a>>,
    pub default: Option<Expr<'a>>,
    pub kind: ParamKind,
}

/// Returns the first statement's string value, cleaned with [`clean_doc`], if
/// it is a plain string literal expression statement.
pub fn docstring(body: &[Stmt<'_>]) -> Option<String> {
    match body.first()? {
        Stmt::Expr {
            value: Expr::Str(parts),
            ..
        } => decode_string_parts(parts).map(|doc| clean_doc(&doc)),
        _ => None,
    }
}

/// Normalize docstring indentation as Python's `inspect.cleandoc` does: tabs
/// are expanded, the first line loses its leading whitespace, later lines
/// lose their common indentation, and blank lines at either end are dropped.
pub fn clean_doc(doc: &str) -> String {
    let doc = doc.replace("\r\n", "\n");
    let mut lines: Vec<String> = doc.split('\n').map(expand_tabs).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let content = line.trim_start();
            (!content.is_empty()).then(|| line.chars().count() - content.chars().count())
        })
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);
    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    const TAB_STOP: usize = 8;
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = TAB_STOP - col % TAB_STOP;
            out.push_str(&" ".repeat(spaces));
            col += spaces;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Name(&'a str),
    Number(&'a str),
    /// One or more adjacent string literal tokens, verbatim.
    Str(Vec<&'a str>),
    Ellipsis,
    Attribute {
        value: Box<Expr<'a>>,
        attr: &'a str,
    },
    Call {
        func: Box<Expr<'a>>,
        args: Vec<Arg<'a>>,
    },
    Subscript {
        value: Box<Expr<'a>>,
        slice: Box<Expr<'a>>,
    },
    Slice {
        lower: Option<Box<Expr<'a>>>,
        upper: Option<Box<Expr<'a>>>,
        step: Option<Box<Expr<'a>>>,
    },
    BinOp {
        left: Box<Expr<'a>>,
        op: &'a str,
        right: Box<Expr<'a>>,
    },
    UnaryOp {
        op: &'a str,
        operand: Box<Expr<'a>>,
    },
    BoolOp {
        op: &'a str,
        values: Vec<Expr<'a>>,
    },
    Compare {
        left: Box<Expr<'a>>,
        comparisons: Vec<(&'static str, Expr<'a>)>,
    },
    IfExp {
        body: Box<Expr<'a>>,
        test: Box<Expr<'a>>,
        orelse: Box<Expr<'a>>,
    },
    Lambda {
        params: Vec<Param<'a>>,
        body: Box<Expr<'a>>,
    },
    NamedExpr {
        target: Box<Expr<'a>>,
        value: Box<Expr<'a>>,
    },
    /// Unparenthesized tuple; `()` is an empty tuple.
    Tuple(Vec<Expr<'a>>),
    List(Vec<Expr<'a>>),
    Set(Vec<Expr<'a>>),
    Dict(Vec<DictItem<'a>>),
    Comprehension {
        kind: CompKind,
        element: Box<Expr<'a>>,
        /// Value expression for dict comprehensions.
        value: Option<Box<Expr<'a>>>,
        generators: Vec<Generator<'a>>,
    },
    Starred(Box<Expr<'a>>),
    DoubleStarred(Box<Expr<'a>>),
    Await(Box<Expr<'a>>),
    Yield(Option<Box<Expr<'a>>>),
    YieldFrom(Box<Expr<'a>>),
    /// Parentheses written in the source.
    Paren(Box<Expr<'a>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    List,
    Set,
    Dict,
    Generator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generator<'a> {
    pub is_async: bool,
    pub target: Expr<'a>,
    pub iter: Expr<'a>,
    pub ifs: Vec<Expr<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DictItem<'a> {
    Pair(Expr<'a>, Expr<'a>),
    Unpack(Expr<'a>),
}

/// A call or class-definition argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg<'a> {
    Positional(Expr<'a>),
    Keyword(&'a str, Expr<'a>),
}

impl<'a> Expr<'a> {
    /// Strip any number of source parentheses.
    pub fn unparenthesized(&self) -> &Expr<'a> {
        match self {
            Expr::Paren(inner) => inner.unparenthesized(),
            other => other,
        }
    }

    /// True if the expression may appear as an assignment target.
    pub fn is_assign_target(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. } => true,
            Expr::Tuple(items) | Expr::List(items) => items.iter().all(|item| match item {
                Expr::Starred(inner) => inner.is_assign_target(),
                other => other.is_assign_target(),
            }),
            Expr::Paren(inner) => inner.is_assign_target(),
            _ => false,
        }
    }

    /// True for targets of augmented and annotated assignments.
    pub fn is_single_target(&self) -> bool {
        matches!(
            self.unparenthesized(),
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }
        )
    }

    /// Short description used in "cannot assign to" errors.
    pub fn describe(&self) -> &'static str {
        match self.unparenthesized() {
            Expr::Call { .. } => "function call",
            Expr::Number(_) | Expr::Str(_) | Expr::Ellipsis => "literal",
            Expr::Name(n) if matches!(*n, "None" | "True" | "False") => "literal",
            Expr::Lambda { .. } => "lambda",
            Expr::Comprehension { .. } => "comprehension",
            Expr::Await(_) => "await expression",
            Expr::Yield(_) | Expr::YieldFrom(_) => "yield expression",
            Expr::NamedExpr { .. } => "named expression",
            Expr::IfExp { .. } => "conditional expression",
            Expr::Dict(_) => "dict literal",
            Expr::Set(_) => "set display",
            Expr::Compare { .. } => "comparison",
            _ => "expression",
        }
    }
}

// ============================================================================
// Re-serialization
// ============================================================================

fn join<T: Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => f.write_str(name),
            Expr::Number(text) => f.write_str(text),
            Expr::Str(parts) => join(f, parts, " "),
            Expr::Ellipsis => f.write_str("..."),
            Expr::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Expr::Call { func, args } => {
                write!(f, "{}(", func)?;
                join(f, args, ", ")?;
                f.write_str(")")
            }
            Expr::Subscript { value, slice } => write!(f, "{}[{}]", value, slice),
            Expr::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    write!(f, "{}", lower)?;
                }
                f.write_str(":")?;
                if let Some(upper) = upper {
                    write!(f, "{}", upper)?;
                }
                if let Some(step) = step {
                    write!(f, ":{}", step)?;
                }
                Ok(())
            }
            Expr::BinOp { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::UnaryOp { op, operand } => {
                if *op == "not" {
                    write!(f, "not {}", operand)
                } else {
                    write!(f, "{}{}", op, operand)
                }
            }
            Expr::BoolOp { op, values } => join(f, values, &format!(" {} ", op)),
            Expr::Compare { left, comparisons } => {
                write!(f, "{}", left)?;
                for (op, right) in comparisons {
                    write!(f, " {} {}", op, right)?;
                }
                Ok(())
            }
            Expr::IfExp { body, test, orelse } => {
                write!(f, "{} if {} else {}", body, test, orelse)
            }
            Expr::Lambda { params, body } => {
                f.write_str("lambda")?;
                if !params.is_empty() {
                    f.write_str(" ")?;
                    write_params(f, params)?;
                }
                write!(f, ": {}", body)
            }
            Expr::NamedExpr { target, value } => write!(f, "{} := {}", target, value),
            Expr::Tuple(items) => match items.len() {
                0 => f.write_str("()"),
                1 => write!(f, "{},", items[0]),
                _ => join(f, items, ", "),
            },
            Expr::List(items) => {
                f.write_str("[")?;
                join(f, items, ", ")?;
                f.write_str("]")
            }
            Expr::Set(items) => {
                f.write_str("{")?;
                join(f, items, ", ")?;
                f.write_str("}")
            }
            Expr::Dict(items) => {
                f.write_str("{")?;
                join(f, items, ", ")?;
                f.write_str("}")
            }
            Expr::Comprehension {
                kind,
                element,
                value,
                generators,
            } => {
                let (open, close) = match kind {
                    CompKind::List => ("[", "]"),
                    CompKind::Set | CompKind::Dict => ("{", "}"),
                    CompKind::Generator => ("", ""),
                };
                f.write_str(open)?;
                write!(f, "{}", element)?;
                if let Some(value) = value {
                    write!(f, ": {}", value)?;
                }
                for generator in generators {
                    write!(f, " {}", generator)?;
                }
                f.write_str(close)
            }
            Expr::Starred(inner) => write!(f, "*{}", inner),
            Expr::DoubleStarred(inner) => write!(f, "**{}", inner),
            Expr::Await(inner) => write!(f, "await {}", inner),
            Expr::Yield(None) => f.write_str("yield"),
            Expr::Yield(Some(inner)) => write!(f, "yield {}", inner),
            Expr::YieldFrom(inner) => write!(f, "yield from {}", inner),
            Expr::Paren(inner) => write!(f, "({})", inner),
        }
    }
}

impl Display for Generator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_async {
            f.write_str("async ")?;
        }
        write!(f, "for {} in {}", self.target, self.iter)?;
        for cond in &self.ifs {
            write!(f, " if {}", cond)?;
        }
        Ok(())
    }
}

impl Display for DictItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictItem::Pair(key, value) => write!(f, "{}: {}", key, value),
            DictItem::Unpack(value) => write!(f, "**{}", value),
        }
    }
}

impl Display for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Positional(expr) => write!(f, "{}", expr),
            Arg::Keyword(name, expr) => write!(f, "{}={}", name, expr),
        }
    }
}

impl Display for Param<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.name)?;
        if let Some(annotation) = &self.annotation {
            write!(f, ": {}", annotation)?;
        }
        match (&self.default, self.annotation.is_some()) {
            (Some(default), true) => write!(f, " = {}", default),
            (Some(default), false) => write!(f, "={}", default),
            (None, _) => Ok(()),
        }
    }
}

/// Write a parameter list, restoring the `/` and bare `*` markers.
fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param<'_>]) -> fmt::Result {
    let last_positional_only = params
        .iter()
        .rposition(|p| p.kind == ParamKind::PositionalOnly);
    let has_varargs = params.iter().any(|p| p.kind == ParamKind::VarArgs);
    let mut first = true;
    let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
        if !first {
            f.write_str(", ")?;
        }
        first = false;
        Ok(())
    };

    let mut bare_star_written = false;
    for (i, param) in params.iter().enumerate() {
        if param.kind == ParamKind::KeywordOnly && !has_varargs && !bare_star_written {
            sep(f)?;
            f.write_str("*")?;
            bare_star_written = true;
        }
        sep(f)?;
        write!(f, "{}", param)?;
        if Some(i) == last_positional_only {
            sep(f)?;
            f.write_str("/")?;
        }
    }
    Ok(())
}

// ============================================================================
// String Literal Decoding
// ============================================================================

/// Split a string token into (prefix, body without quotes).
fn split_string_token(token: &str) -> (&str, &str) {
    let quote_at = token.find(['\'', '"']).unwrap_or(0);
    let (prefix, quoted) = token.split_at(quote_at);
    let quote_len = if quoted.len() >= 6 && (quoted.starts_with("'''") || quoted.starts_with("\"\"\""))
    {
        3
    } else {
        1
    };
    let body = quoted
        .get(quote_len..quoted.len().saturating_sub(quote_len))
        .unwrap_or("");
    (prefix, body)
}

/// Decode adjacent string literal tokens into their runtime value. Returns
/// None if any part is a bytes, f-string or template string literal.
pub fn decode_string_parts(parts: &[&str]) -> Option<String> {
    let mut out = String::new();
    for part in parts {
        let (prefix, body) = split_string_token(part);
        let prefix = prefix.to_ascii_lowercase();
        if prefix.contains(['b', 'f', 't']) {
            return None;
        }
        if prefix.contains('r') {
            out.push_str(body);
        } else {
            decode_escapes(body, &mut out);
        }
    }
    Some(out)
}

fn decode_escapes(body: &str, out: &mut String) {
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            'x' | 'u' | 'U' => {
                let width = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width).filter_map(|_| chars.next_if(char::is_ascii_hexdigit)).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(ch) if digits.len() == width => out.push(ch),
                    _ => {
                        out.push('\\');
                        out.push(esc);
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_escapes_in_plain_strings() {
        assert_eq!(
            decode_string_parts(&[r#""a\tb\n\x41é\101""#]),
            Some("a\tb\nA\u{e9}A".to_string())
        );
    }

    #[test]
    fn raw_strings_keep_backslashes() {
        assert_eq!(
            decode_string_parts(&[r#"r"\d+""#]),
            Some("\\d+".to_string())
        );
    }

    #[test]
    fn triple_quoted_and_concatenated() {
        assert_eq!(
            decode_string_parts(&["'''Doc\nmore'''", "' tail'"]),
            Some("Doc\nmore tail".to_string())
        );
    }

    #[test]
    fn bytes_and_fstrings_are_not_text() {
        assert_eq!(decode_string_parts(&["b'x'"]), None);
        assert_eq!(decode_string_parts(&["f'{x}'"]), None);
        assert_eq!(decode_string_parts(&["t'{x}'"]), None);
    }

    mod clean_doc {
        use super::super::clean_doc;

        #[test]
        fn strips_common_indent_after_first_line() {
            let raw = "\n    Summary line.\n\n        Indented detail.\n    ";
            assert_eq!(clean_doc(raw), "Summary line.\n\n    Indented detail.");
        }

        #[test]
        fn first_line_indent_does_not_count() {
            let raw = "  Summary.\n\n    Args:\n        x: value\n    ";
            assert_eq!(clean_doc(raw), "Summary.\n\nArgs:\n    x: value");
        }

        #[test]
        fn tabs_expand_before_measuring() {
            assert_eq!(clean_doc("Doc.\n\tbody\n        more"), "Doc.\nbody\nmore");
        }

        #[test]
        fn crlf_and_surrounding_blank_lines() {
            assert_eq!(clean_doc("\r\n\r\n  One line.  \r\n\r\n"), "One line.  ");
            assert_eq!(clean_doc("   "), "");
        }
    }

    #[test]
    fn unknown_escape_is_kept() {
        assert_eq!(
            decode_string_parts(&[r"'\q'"]),
            Some("\\q".to_string())
        );
    }

    #[test]
    fn empty_string_tokens() {
        assert_eq!(decode_string_parts(&["''"]), Some(String::new()));
        assert_eq!(decode_string_parts(&["\"\"\"\"\"\""]), Some(String::new()));
    }
}
