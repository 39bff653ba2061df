// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! PEG grammar over the token stream.
//!
//! The grammar accepts the full statement and expression syntax so that a
//! syntax error anywhere in a file is detected. Statements the analyzer does not
//! inspect are reduced to [`Stmt::Other`]. Rules a PEG cannot express
//! (assignment targets, parameter order, argument order) are checked in the
//! actions and reported to the [`ParseContext`] rather than failing the match.
//!
//! Operator chains (unary prefixes, `not`, `**`, conditional expressions,
//! lambda headers) are matched as repetitions and folded in the actions, so
//! native recursion grows with bracket nesting only.

use std::cell::RefCell;
use std::fmt;

use codescope_core::model::ParamKind;
use peg::{Parse, ParseElem, ParseLiteral, RuleResult};

use super::ast::{
    Alias, Arg, ClassDef, CompKind, DictItem, Expr, FunctionDef, Generator, Module, Param, Stmt,
};
use super::{is_keyword, ParserError};
use crate::tokenizer::{Position, TokType, Token};

const AUGASSIGN_OPS: [&str; 13] = [
    "+=", "-=", "*=", "/=", "//=", "%=", "@=", "&=", "|=", "^=", ">>=", "<<=", "**=",
];

// ============================================================================
// Token Input
// ============================================================================

#[derive(Debug)]
pub struct TokVec<'a>(Vec<Token<'a>>);

impl<'a> From<Vec<Token<'a>>> for TokVec<'a> {
    fn from(tokens: Vec<Token<'a>>) -> Self {
        TokVec(tokens)
    }
}

impl<'a> TokVec<'a> {
    pub fn as_slice(&self) -> &[Token<'a>] {
        &self.0
    }
}

/// Where the grammar stopped: the token index and its source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLoc {
    pub index: usize,
    pub start: Position,
}

impl fmt::Display for ParseLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.start.line, self.start.col + 1)
    }
}

impl Parse for TokVec<'_> {
    type PositionRepr = ParseLoc;

    fn start(&self) -> usize {
        0
    }

    fn is_eof(&self, pos: usize) -> bool {
        pos >= self.0.len()
    }

    fn position_repr(&self, pos: usize) -> Self::PositionRepr {
        let start = self
            .0
            .get(pos)
            .or(self.0.last())
            .map_or(Position::START, |tok| tok.start);
        ParseLoc { index: pos, start }
    }
}

pub type TokenRef<'input, 'a> = &'input Token<'a>;

impl<'input, 'a: 'input> ParseElem<'input> for TokVec<'a> {
    type Element = TokenRef<'input, 'a>;

    fn parse_elem(&'input self, pos: usize) -> RuleResult<Self::Element> {
        match self.0.get(pos) {
            Some(tok) => RuleResult::Matched(pos + 1, tok),
            None => RuleResult::Failed,
        }
    }
}

/// Keywords and operators match a real token with the same text.
impl ParseLiteral for TokVec<'_> {
    fn parse_string_literal(&self, pos: usize, literal: &str) -> RuleResult<()> {
        match self.0.get(pos) {
            Some(tok) if tok.text == literal && !tok.is_synthetic() => {
                RuleResult::Matched(pos + 1, ())
            }
            _ => RuleResult::Failed,
        }
    }
}

// ============================================================================
// Parse Context
// ============================================================================

/// Token positions for line numbers, plus the errors found in syntax that
/// otherwise matched.
pub struct ParseContext {
    starts: Vec<Position>,
    /// End line of the last non-synthetic token before each index.
    end_lines: Vec<u32>,
    errors: RefCell<Vec<ParserError>>,
}

impl ParseContext {
    pub fn new(tokens: &[Token<'_>]) -> Self {
        let mut end_lines = Vec::with_capacity(tokens.len() + 1);
        let mut last = 1;
        for tok in tokens {
            end_lines.push(last);
            if !tok.is_synthetic() {
                last = tok.end.line;
            }
        }
        end_lines.push(last);
        ParseContext {
            starts: tokens.iter().map(|tok| tok.start).collect(),
            end_lines,
            errors: RefCell::new(Vec::new()),
        }
    }

    fn position(&self, index: usize) -> Position {
        self.starts
            .get(index)
            .or(self.starts.last())
            .copied()
            .unwrap_or(Position::START)
    }

    fn line(&self, index: usize) -> u32 {
        self.position(index).line
    }

    fn end_line_before(&self, index: usize) -> u32 {
        self.end_lines
            .get(index)
            .or(self.end_lines.last())
            .copied()
            .unwrap_or(1)
    }

    fn report(&self, message: impl Into<String>, index: usize) {
        self.errors
            .borrow_mut()
            .push(ParserError::syntax(message, self.position(index)));
    }

    fn check_target(&self, target: &Expr<'_>, index: usize, verb: &str) {
        if !target.is_assign_target() {
            self.report(format!("cannot {} {}", verb, target.describe()), index);
        }
    }

    /// The reported error closest to the start of the source.
    pub fn first_error(self) -> Option<ParserError> {
        self.errors
            .into_inner()
            .into_iter()
            .min_by_key(ParserError::offset)
    }
}

// ============================================================================
// Grammar
// ============================================================================

peg::parser! {
    pub grammar python<'a>(ctx: &ParseContext) for TokVec<'a> {

        // Token classes. Keywords and operators are matched as literals.

        rule tok(kind: TokType) -> TokenRef<'input, 'a>
            = [t] {? if t.kind == kind { Ok(t) } else { Err("token") } }

        rule name() -> TokenRef<'input, 'a>
            = quiet!{ [t] {? if t.kind == TokType::Name && !is_keyword(t.text) { Ok(t) } else { Err("name") } } }
            / expected!("name")

        rule number() -> TokenRef<'input, 'a>
            = quiet!{ tok(TokType::Number) } / expected!("number")

        rule string() -> TokenRef<'input, 'a>
            = quiet!{ tok(TokType::String) } / expected!("string")

        rule newline() = quiet!{ tok(TokType::Newline) } / expected!("NEWLINE")
        rule indent() = quiet!{ tok(TokType::Indent) } / expected!("INDENT")
        rule dedent() = quiet!{ tok(TokType::Dedent) } / expected!("DEDENT")
        rule eof() = quiet!{ tok(TokType::EndMarker) } / expected!("EOF")

        // Module and blocks

        pub rule file() -> Module<'a>
            = body:statements()? eof() { Module { body: body.unwrap_or_default() } }

        rule statements() -> Vec<Stmt<'a>>
            = groups:statement()+ { groups.into_iter().flatten().collect() }

        rule statement() -> Vec<Stmt<'a>>
            = s:compound_stmt() { vec![s] }
            / simple_stmts()

        rule block() -> Vec<Stmt<'a>>
            = newline() indent() body:statements() dedent() { body }
            / simple_stmts()

        // Compound statements

        rule compound_stmt() -> Stmt<'a>
            = decorated()
            / f:function_def() { Stmt::FunctionDef(f) }
            / c:class_def() { Stmt::ClassDef(c) }
            / if_stmt()
            / while_stmt()
            / for_stmt()
            / try_stmt()
            / with_stmt()
            / match_stmt()

        rule decorated() -> Stmt<'a>
            = decorators:("@" d:named_expression() newline() { d })+
              def:(f:function_def() { Stmt::FunctionDef(f) } / c:class_def() { Stmt::ClassDef(c) })
            { with_decorators(def, decorators) }

        rule function_def() -> FunctionDef<'a>
            = is_async:"async"? keyword:position!() "def" n:name() type_params()?
              "(" params:parameters()? ")"
              returns:("->" e:expression() { e })?
              ":" body:block() end:position!()
            {
                FunctionDef {
                    name: n.text,
                    params: params.unwrap_or_default(),
                    returns,
                    decorators: Vec::new(),
                    body,
                    is_async: is_async.is_some(),
                    line: ctx.line(keyword),
                    end_line: ctx.end_line_before(end),
                }
            }

        rule class_def() -> ClassDef<'a>
            = keyword:position!() "class" n:name() type_params()?
              args:("(" a:arguments()? ")" { a.unwrap_or_default() })?
              ":" body:block() end:position!()
            {
                ClassDef {
                    name: n.text,
                    args: args.unwrap_or_default(),
                    decorators: Vec::new(),
                    body,
                    line: ctx.line(keyword),
                    end_line: ctx.end_line_before(end),
                }
            }

        rule type_params()
            = "[" (type_param() ++ ",") ","? "]"

        rule type_param()
            = ("**" / "*")? name() (":" expression())? ("=" expression())?

        rule if_stmt() -> Stmt<'a>
            = start:position!() "if" named_expression() ":" block()
              ("elif" named_expression() ":" block())*
              else_block()?
            { other(ctx, start) }

        rule else_block()
            = "else" ":" block()

        rule while_stmt() -> Stmt<'a>
            = start:position!() "while" named_expression() ":" block() else_block()?
            { other(ctx, start) }

        rule for_stmt() -> Stmt<'a>
            = start:position!() "async"? "for" target_list() "in" star_expressions() ":" block()
              else_block()?
            { other(ctx, start) }

        rule try_stmt() -> Stmt<'a>
            = start:position!() "try" ":" block() try_handlers()
            { other(ctx, start) }

        rule try_handlers()
            = except_clause()+ else_block()? finally_block()?
            / finally_block()

        rule except_clause()
            = "except" "*"? (expression() ("," expression())* ","? ("as" name())?)? ":" block()

        rule finally_block()
            = "finally" ":" block()

        rule with_stmt() -> Stmt<'a>
            = start:position!() "async"? "with" with_items() ":" block()
            { other(ctx, start) }

        rule with_items()
            = "(" (with_item() ++ ",") ","? ")" &":"
            / with_item() ++ ","

        rule with_item()
            = expression() ("as" p:position!() t:target_element() { ctx.check_target(&t, p, "assign to") })?

        // `match` and `case` are soft keywords; patterns are matched as
        // balanced token runs.
        rule match_stmt() -> Stmt<'a>
            = start:position!() "match" star_named_expressions() ":"
              newline() indent() case_block()+ dedent()
            { other(ctx, start) }

        rule case_block()
            = "case" pattern_piece()+ ("if" named_expression())? ":" block()

        rule pattern_piece()
            = "(" pattern_inner()* ")"
            / "[" pattern_inner()* "]"
            / "{" pattern_inner()* "}"
            / pattern_token(false)

        rule pattern_inner()
            = pattern_piece()
            / pattern_token(true)

        rule pattern_token(nested: bool)
            = quiet!{ [t] {? if is_pattern_token(t, nested) { Ok(()) } else { Err("pattern") } } }
            / expected!("pattern")

        // Simple statements

        rule simple_stmts() -> Vec<Stmt<'a>>
            = stmts:(simple_stmt() ++ ";") ";"? newline() { stmts }

        rule simple_stmt() -> Stmt<'a>
            = type_alias()
            / expression_stmt()
            / start:position!() ("pass" / "break" / "continue") { other(ctx, start) }
            / start:position!() "return" star_expressions()? { other(ctx, start) }
            / start:position!() "raise" (expression() ("from" expression())?)? { other(ctx, start) }
            / start:position!() ("global" / "nonlocal") (name() ++ ",") { other(ctx, start) }
            / start:position!() "del" del_targets() { other(ctx, start) }
            / start:position!() "assert" expression() ("," expression())? { other(ctx, start) }
            / import_name()
            / import_from()

        rule type_alias() -> Stmt<'a>
            = start:position!() "type" name() type_params()? "=" expression()
            { other(ctx, start) }

        rule del_targets()
            = (p:position!() t:target_element() { ctx.check_target(&t, p, "delete") }) ++ "," ","?

        rule expression_stmt() -> Stmt<'a>
            = start:position!() first:assignment_value() tail:assign_tail()? {
                expression_statement(ctx, start, first, tail)
            }

        rule assignment_value() -> Expr<'a>
            = yield_expr()
            / star_expressions()

        rule assign_tail() -> AssignTail<'a>
            = ":" expression() ("=" assignment_value())? { AssignTail::Annotated }
            / augassign() assignment_value() { AssignTail::Augmented }
            / values:("=" p:position!() v:assignment_value() { (p, v) })+ { AssignTail::Chain(values) }

        rule augassign()
            = quiet!{ [t] {?
                if t.kind == TokType::Op && AUGASSIGN_OPS.contains(&t.text) {
                    Ok(())
                } else {
                    Err("augmented assignment")
                }
            } }

        // Imports

        rule import_name() -> Stmt<'a>
            = start:position!() "import" names:(dotted_as_name() ++ ",") {
                Stmt::Import { names, line: ctx.line(start) }
            }

        rule dotted_as_name() -> Alias<'a>
            = name:dotted_name() asname:("as" n:name() { n.text })? { Alias { name, asname } }

        rule dotted_name() -> String
            = parts:(n:name() { n.text }) ++ "." { parts.join(".") }

        rule import_from() -> Stmt<'a>
            = start:position!() "from" source:import_source() "import" names:import_targets() {
                let (level, module) = source;
                Stmt::ImportFrom { module, level, names, line: ctx.line(start) }
            }

        // Leading dots and the dotted module path; at least one is present
        rule import_source() -> (usize, Option<String>)
            = dots:import_dots()+ module:dotted_name()? { (dots.iter().sum::<usize>(), module) }
            / module:dotted_name() { (0, Some(module)) }

        rule import_dots() -> usize
            = "..." { 3 }
            / "." { 1 }

        rule import_targets() -> Vec<Alias<'a>>
            = "(" names:(import_as_name() ++ ",") ","? ")" { names }
            / "*" { vec![Alias { name: "*".to_string(), asname: None }] }
            / names:(import_as_name() ++ ",") !"," { names }

        rule import_as_name() -> Alias<'a>
            = n:name() asname:("as" a:name() { a.text })? {
                Alias { name: n.text.to_string(), asname }
            }

        // Assignment targets

        rule target_list() -> Expr<'a>
            = start:position!() first:target_element() rest:("," t:target_element() { t })*
              trailing:","?
            {
                let target = tuple_or_single(first, rest, trailing.is_some());
                ctx.check_target(&target, start, "assign to");
                target
            }

        rule target_element() -> Expr<'a>
            = "*" e:bitwise_or() { Expr::Starred(Box::new(e)) }
            / bitwise_or()

        // Expressions

        rule star_expressions() -> Expr<'a>
            = first:star_expression() rest:("," e:star_expression() { e })* trailing:","? {
                tuple_or_single(first, rest, trailing.is_some())
            }

        rule star_expression() -> Expr<'a>
            = "*" e:bitwise_or() { Expr::Starred(Box::new(e)) }
            / expression()

        rule star_named_expressions() -> Expr<'a>
            = first:star_named_expression() rest:("," e:star_named_expression() { e })*
              trailing:","?
            { tuple_or_single(first, rest, trailing.is_some()) }

        rule star_named_expression() -> Expr<'a>
            = "*" e:bitwise_or() { Expr::Starred(Box::new(e)) }
            / named_expression()

        rule named_expression() -> Expr<'a>
            = n:name() ":=" value:expression() {
                Expr::NamedExpr { target: Box::new(Expr::Name(n.text)), value: Box::new(value) }
            }
            / expression()

        rule expression() -> Expr<'a>
            = heads:lambda_head()* body:conditional() { wrap_lambdas(heads, body) }

        rule lambda_head() -> Vec<Param<'a>>
            = "lambda" params:lambda_parameters()? ":" { params.unwrap_or_default() }

        rule conditional() -> Expr<'a>
            = first:disjunction() tails:conditional_tail()* { fold_conditional(first, tails) }

        rule conditional_tail() -> CondTail<'a>
            = "if" test:disjunction() "else" lambdas:lambda_head()* orelse:disjunction() {
                CondTail { test, lambdas, orelse }
            }

        rule yield_expr() -> Expr<'a>
            = "yield" "from" e:expression() { Expr::YieldFrom(Box::new(e)) }
            / "yield" e:star_expressions()? { Expr::Yield(e.map(Box::new)) }

        rule disjunction() -> Expr<'a>
            = first:conjunction() rest:("or" e:conjunction() { e })* { bool_op("or", first, rest) }

        rule conjunction() -> Expr<'a>
            = first:inversion() rest:("and" e:inversion() { e })* { bool_op("and", first, rest) }

        rule inversion() -> Expr<'a>
            = nots:"not"* operand:comparison() { wrap_unary(vec!["not"; nots.len()], operand) }

        rule comparison() -> Expr<'a>
            = left:bitwise_or() rest:(op:compare_op() right:bitwise_or() { (op, right) })* {
                compare(left, rest)
            }

        rule compare_op() -> &'static str
            = "==" { "==" }
            / "!=" { "!=" }
            / "<=" { "<=" }
            / ">=" { ">=" }
            / "<" { "<" }
            / ">" { ">" }
            / "not" "in" { "not in" }
            / "in" { "in" }
            / "is" "not" { "is not" }
            / "is" { "is" }

        rule bitwise_or() -> Expr<'a> = precedence! {
            left:(@) "|" right:@ { binop(left, "|", right) }
            --
            left:(@) "^" right:@ { binop(left, "^", right) }
            --
            left:(@) "&" right:@ { binop(left, "&", right) }
            --
            left:(@) "<<" right:@ { binop(left, "<<", right) }
            left:(@) ">>" right:@ { binop(left, ">>", right) }
            --
            left:(@) "+" right:@ { binop(left, "+", right) }
            left:(@) "-" right:@ { binop(left, "-", right) }
            --
            left:(@) "*" right:@ { binop(left, "*", right) }
            left:(@) "/" right:@ { binop(left, "/", right) }
            left:(@) "//" right:@ { binop(left, "//", right) }
            left:(@) "%" right:@ { binop(left, "%", right) }
            left:(@) "@" right:@ { binop(left, "@", right) }
            --
            operand:factor() { operand }
        }

        rule factor() -> Expr<'a>
            = ops:unary_op()* operand:power() { wrap_unary(ops, operand) }

        rule unary_op() -> &'static str
            = "+" { "+" }
            / "-" { "-" }
            / "~" { "~" }

        rule power() -> Expr<'a>
            = base:await_primary() rest:("**" ops:unary_op()* e:await_primary() { (ops, e) })* {
                fold_power(base, rest)
            }

        rule await_primary() -> Expr<'a>
            = "await" e:primary() { Expr::Await(Box::new(e)) }
            / primary()

        rule primary() -> Expr<'a>
            = value:atom() trailers:trailer()* { trailers.into_iter().fold(value, apply_trailer) }

        rule trailer() -> Trailer<'a>
            = "." n:name() { Trailer::Attribute(n.text) }
            / "(" args:arguments()? ")" { Trailer::Call(args.unwrap_or_default()) }
            / "[" s:slices() "]" { Trailer::Subscript(s) }

        rule atom() -> Expr<'a>
            = n:name() { Expr::Name(n.text) }
            / "None" { Expr::Name("None") }
            / "True" { Expr::Name("True") }
            / "False" { Expr::Name("False") }
            / t:number() { Expr::Number(t.text) }
            / parts:string()+ { Expr::Str(parts.into_iter().map(|t| t.text).collect()) }
            / "..." { Expr::Ellipsis }
            / paren_atom()
            / list_atom()
            / brace_atom()

        // Displays and comprehensions

        rule paren_atom() -> Expr<'a>
            = "(" ")" { Expr::Tuple(Vec::new()) }
            / "(" y:yield_expr() ")" { Expr::Paren(Box::new(y)) }
            / "(" first:star_named_expression() tail:display_tail()? ")" {
                let inner = match tail {
                    Some(DisplayTail::Comprehension(generators)) => {
                        comprehension(CompKind::Generator, first, None, generators)
                    }
                    Some(DisplayTail::Items(rest)) => Expr::Tuple(prepend(first, rest)),
                    None => first,
                };
                Expr::Paren(Box::new(inner))
            }

        rule list_atom() -> Expr<'a>
            = "[" "]" { Expr::List(Vec::new()) }
            / "[" first:star_named_expression() tail:display_tail()? "]" {
                match tail {
                    Some(DisplayTail::Comprehension(generators)) => {
                        comprehension(CompKind::List, first, None, generators)
                    }
                    Some(DisplayTail::Items(rest)) => Expr::List(prepend(first, rest)),
                    None => Expr::List(vec![first]),
                }
            }

        rule display_tail() -> DisplayTail<'a>
            = generators:generators() { DisplayTail::Comprehension(generators) }
            / "," rest:(star_named_expression() ** ",") ","? { DisplayTail::Items(rest) }

        rule brace_atom() -> Expr<'a>
            = "{" "}" { Expr::Dict(Vec::new()) }
            / "{" "**" first:bitwise_or() rest:dict_items() "}" {
                Expr::Dict(prepend(DictItem::Unpack(first), rest))
            }
            / "{" key:star_named_expression() tail:brace_tail() "}" { brace_display(key, tail) }

        rule brace_tail() -> BraceTail<'a>
            = ":" value:expression() rest:dict_rest() { BraceTail::Dict(value, rest) }
            / generators:generators() { BraceTail::SetComprehension(generators) }
            / rest:set_items() { BraceTail::Set(rest) }

        rule dict_rest() -> DictRest<'a>
            = generators:generators() { DictRest::Comprehension(generators) }
            / items:dict_items() { DictRest::Items(items) }

        rule dict_items() -> Vec<DictItem<'a>>
            = items:("," item:dict_item() { item })* ","? { items }

        rule dict_item() -> DictItem<'a>
            = "**" value:bitwise_or() { DictItem::Unpack(value) }
            / key:expression() ":" value:expression() { DictItem::Pair(key, value) }

        rule set_items() -> Vec<Expr<'a>>
            = items:("," e:star_named_expression() { e })* ","? { items }

        rule generators() -> Vec<Generator<'a>>
            = generator()+

        rule generator() -> Generator<'a>
            = is_async:"async"? "for" target:target_list() "in" iter:disjunction()
              ifs:("if" c:disjunction() { c })*
            {
                Generator { is_async: is_async.is_some(), target, iter, ifs }
            }

        // Subscripts

        rule slices() -> Expr<'a>
            = first:slice() rest:("," s:slice() { s })* trailing:","? {
                tuple_or_single(first, rest, trailing.is_some())
            }

        rule slice() -> Expr<'a>
            = lower:star_named_expression()? bounds:slice_bounds()? {?
                match (lower, bounds) {
                    (lower, Some((upper, step))) => Ok(Expr::Slice {
                        lower: lower.map(Box::new),
                        upper: upper.map(Box::new),
                        step: step.map(Box::new),
                    }),
                    (Some(expr), None) => Ok(expr),
                    (None, None) => Err("expression"),
                }
            }

        rule slice_bounds() -> (Option<Expr<'a>>, Option<Expr<'a>>)
            = ":" upper:expression()? step:(":" s:expression()? { s })? { (upper, step.flatten()) }

        // Call arguments and parameters

        rule arguments() -> Vec<Arg<'a>>
            = args:(argument() ++ ",") ","? { call_arguments(ctx, args) }

        rule argument() -> (usize, Arg<'a>)
            = p:position!() "**" e:expression() {
                (p, Arg::Positional(Expr::DoubleStarred(Box::new(e))))
            }
            / p:position!() "*" e:expression() { (p, Arg::Positional(Expr::Starred(Box::new(e)))) }
            / p:position!() n:name() "=" e:expression() { (p, Arg::Keyword(n.text, e)) }
            / p:position!() e:named_expression() generators:generators()? {
                let value = match generators {
                    Some(generators) => comprehension(CompKind::Generator, e, None, generators),
                    None => e,
                };
                (p, Arg::Positional(value))
            }

        rule parameters() -> Vec<Param<'a>>
            = items:(parameter() ++ ",") ","? { build_params(ctx, items) }

        rule parameter() -> (usize, ParamItem<'a>)
            = p:position!() "/" { (p, ParamItem::Slash) }
            / p:position!() "**" n:name() a:annotation()? { (p, ParamItem::DoubleStar(n.text, a)) }
            / p:position!() "*" n:name() a:(":" e:star_expression() { e })? {
                (p, ParamItem::Star(Some((n.text, a))))
            }
            / p:position!() "*" { (p, ParamItem::Star(None)) }
            / p:position!() n:name() a:annotation()? d:default()? { (p, ParamItem::Plain(n.text, a, d)) }

        rule lambda_parameters() -> Vec<Param<'a>>
            = items:(lambda_parameter() ++ ",") ","? { build_params(ctx, items) }

        rule lambda_parameter() -> (usize, ParamItem<'a>)
            = p:position!() "/" { (p, ParamItem::Slash) }
            / p:position!() "**" n:name() { (p, ParamItem::DoubleStar(n.text, None)) }
            / p:position!() "*" n:name() { (p, ParamItem::Star(Some((n.text, None)))) }
            / p:position!() "*" { (p, ParamItem::Star(None)) }
            / p:position!() n:name() d:default()? { (p, ParamItem::Plain(n.text, None, d)) }

        rule annotation() -> Expr<'a>
            = ":" e:expression() { e }

        rule default() -> Expr<'a>
            = "=" e:expression() { e }
    }
}

// ============================================================================
// Action Helpers
// ============================================================================

fn other<'a>(ctx: &ParseContext, start: usize) -> Stmt<'a> {
    Stmt::Other {
        line: ctx.line(start),
    }
}

fn with_decorators<'a>(def: Stmt<'a>, decorators: Vec<Expr<'a>>) -> Stmt<'a> {
    match def {
        Stmt::FunctionDef(mut f) => {
            f.decorators = decorators;
            Stmt::FunctionDef(f)
        }
        Stmt::ClassDef(mut c) => {
            c.decorators = decorators;
            Stmt::ClassDef(c)
        }
        stmt => stmt,
    }
}

/// Tokens allowed in a case pattern outside brackets (`nested` false) or
/// inside them.
fn is_pattern_token(tok: &Token<'_>, nested: bool) -> bool {
    match tok.kind {
        TokType::Name => nested || tok.text != "if",
        TokType::Number | TokType::String => true,
        TokType::Op => match tok.text {
            "(" | "[" | "{" | ")" | "]" | "}" => false,
            ":" => nested,
            _ => true,
        },
        _ => false,
    }
}

fn prepend<T>(first: T, rest: Vec<T>) -> Vec<T> {
    let mut items = Vec::with_capacity(rest.len() + 1);
    items.push(first);
    items.extend(rest);
    items
}

/// A bare tuple when there is a comma, otherwise the single element.
fn tuple_or_single<'a>(first: Expr<'a>, rest: Vec<Expr<'a>>, trailing_comma: bool) -> Expr<'a> {
    if rest.is_empty() && !trailing_comma {
        first
    } else {
        Expr::Tuple(prepend(first, rest))
    }
}

fn binop<'a>(left: Expr<'a>, op: &'a str, right: Expr<'a>) -> Expr<'a> {
    Expr::BinOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn bool_op<'a>(op: &'a str, first: Expr<'a>, rest: Vec<Expr<'a>>) -> Expr<'a> {
    if rest.is_empty() {
        first
    } else {
        Expr::BoolOp {
            op,
            values: prepend(first, rest),
        }
    }
}

fn compare<'a>(left: Expr<'a>, comparisons: Vec<(&'static str, Expr<'a>)>) -> Expr<'a> {
    if comparisons.is_empty() {
        left
    } else {
        Expr::Compare {
            left: Box::new(left),
            comparisons,
        }
    }
}

/// Apply prefix operators, innermost last.
fn wrap_unary<'a>(ops: Vec<&'a str>, operand: Expr<'a>) -> Expr<'a> {
    ops.into_iter()
        .rev()
        .fold(operand, |operand, op| Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
}

/// `a ** b ** c` groups to the right, and a prefix operator on an exponent
/// covers the rest of the chain: `a ** -b ** c` is `a ** (-(b ** c))`.
fn fold_power<'a>(base: Expr<'a>, rest: Vec<(Vec<&'a str>, Expr<'a>)>) -> Expr<'a> {
    let mut rest = rest.into_iter().rev();
    let Some((ops, last)) = rest.next() else {
        return base;
    };
    let mut exponent = wrap_unary(ops, last);
    for (ops, operand) in rest {
        exponent = wrap_unary(ops, binop(operand, "**", exponent));
    }
    binop(base, "**", exponent)
}

fn wrap_lambdas<'a>(heads: Vec<Vec<Param<'a>>>, body: Expr<'a>) -> Expr<'a> {
    heads
        .into_iter()
        .rev()
        .fold(body, |body, params| Expr::Lambda {
            params,
            body: Box::new(body),
        })
}

/// `if test else orelse` following a conditional's body. Lambda headers on
/// `orelse` extend over every later tail.
pub struct CondTail<'a> {
    test: Expr<'a>,
    lambdas: Vec<Vec<Param<'a>>>,
    orelse: Expr<'a>,
}

fn if_exp<'a>(body: Expr<'a>, test: Expr<'a>, orelse: Expr<'a>) -> Expr<'a> {
    Expr::IfExp {
        body: Box::new(body),
        test: Box::new(test),
        orelse: Box::new(orelse),
    }
}

/// Fold `a if t1 else b if t2 else c` into right-nested conditionals.
fn fold_conditional<'a>(first: Expr<'a>, tails: Vec<CondTail<'a>>) -> Expr<'a> {
    // (test, value) of the conditional to the right of the current body
    let mut pending: Option<(Expr<'a>, Expr<'a>)> = None;
    for tail in tails.into_iter().rev() {
        let body = match pending.take() {
            Some((test, orelse)) => if_exp(tail.orelse, test, orelse),
            None => tail.orelse,
        };
        pending = Some((tail.test, wrap_lambdas(tail.lambdas, body)));
    }
    match pending {
        Some((test, orelse)) => if_exp(first, test, orelse),
        None => first,
    }
}

pub enum Trailer<'a> {
    Attribute(&'a str),
    Call(Vec<Arg<'a>>),
    Subscript(Expr<'a>),
}

fn apply_trailer<'a>(value: Expr<'a>, trailer: Trailer<'a>) -> Expr<'a> {
    let value = Box::new(value);
    match trailer {
        Trailer::Attribute(attr) => Expr::Attribute { value, attr },
        Trailer::Call(args) => Expr::Call { func: value, args },
        Trailer::Subscript(slice) => Expr::Subscript {
            value,
            slice: Box::new(slice),
        },
    }
}

fn comprehension<'a>(
    kind: CompKind,
    element: Expr<'a>,
    value: Option<Expr<'a>>,
    generators: Vec<Generator<'a>>,
) -> Expr<'a> {
    Expr::Comprehension {
        kind,
        element: Box::new(element),
        value: value.map(Box::new),
        generators,
    }
}

pub enum DisplayTail<'a> {
    Comprehension(Vec<Generator<'a>>),
    Items(Vec<Expr<'a>>),
}

pub enum BraceTail<'a> {
    Dict(Expr<'a>, DictRest<'a>),
    SetComprehension(Vec<Generator<'a>>),
    Set(Vec<Expr<'a>>),
}

pub enum DictRest<'a> {
    Comprehension(Vec<Generator<'a>>),
    Items(Vec<DictItem<'a>>),
}

fn brace_display<'a>(key: Expr<'a>, tail: BraceTail<'a>) -> Expr<'a> {
    match tail {
        BraceTail::Dict(value, DictRest::Comprehension(generators)) => {
            comprehension(CompKind::Dict, key, Some(value), generators)
        }
        BraceTail::Dict(value, DictRest::Items(rest)) => {
            Expr::Dict(prepend(DictItem::Pair(key, value), rest))
        }
        BraceTail::SetComprehension(generators) => {
            comprehension(CompKind::Set, key, None, generators)
        }
        BraceTail::Set(rest) => Expr::Set(prepend(key, rest)),
    }
}

// ============================================================================
// Checks
// ============================================================================

pub enum AssignTail<'a> {
    Annotated,
    Augmented,
    /// `= value` pairs with the token index of each value.
    Chain(Vec<(usize, Expr<'a>)>),
}

fn expression_statement<'a>(
    ctx: &ParseContext,
    start: usize,
    first: Expr<'a>,
    tail: Option<AssignTail<'a>>,
) -> Stmt<'a> {
    let line = ctx.line(start);
    match tail {
        None => Stmt::Expr { value: first, line },
        Some(AssignTail::Annotated) => {
            if !first.is_single_target() {
                ctx.report("only single target (not tuple) can be annotated", start);
            }
            Stmt::Other { line }
        }
        Some(AssignTail::Augmented) => {
            if !first.is_single_target() {
                ctx.report(
                    format!(
                        "'{}' is an illegal expression for augmented assignment",
                        first.describe()
                    ),
                    start,
                );
            }
            Stmt::Other { line }
        }
        Some(AssignTail::Chain(values)) => {
            let mut exprs = prepend((start, first), values);
            let value = match exprs.pop() {
                Some((_, value)) => value,
                None => return Stmt::Other { line },
            };
            for (index, target) in &exprs {
                ctx.check_target(target, *index, "assign to");
            }
            Stmt::Assign {
                targets: exprs.into_iter().map(|(_, target)| target).collect(),
                value,
                line,
            }
        }
    }
}

fn call_arguments<'a>(ctx: &ParseContext, args: Vec<(usize, Arg<'a>)>) -> Vec<Arg<'a>> {
    let mut seen_keyword = false;
    let mut seen_double_star = false;
    for (index, arg) in &args {
        match arg {
            Arg::Keyword(..) => seen_keyword = true,
            Arg::Positional(Expr::DoubleStarred(_)) => seen_double_star = true,
            Arg::Positional(Expr::Starred(_)) if seen_double_star => ctx.report(
                "iterable argument unpacking follows keyword argument unpacking",
                *index,
            ),
            Arg::Positional(Expr::Starred(_)) => {}
            Arg::Positional(_) if seen_keyword || seen_double_star => {
                let message = if seen_double_star {
                    "positional argument follows keyword argument unpacking"
                } else {
                    "positional argument follows keyword argument"
                };
                ctx.report(message, *index);
            }
            Arg::Positional(_) => {}
        }
    }
    args.into_iter().map(|(_, arg)| arg).collect()
}

/// One comma-separated entry of a parameter list.
pub enum ParamItem<'a> {
    Slash,
    /// `*name` or a bare `*`.
    Star(Option<(&'a str, Option<Expr<'a>>)>),
    DoubleStar(&'a str, Option<Expr<'a>>),
    Plain(&'a str, Option<Expr<'a>>, Option<Expr<'a>>),
}

fn build_params<'a>(ctx: &ParseContext, items: Vec<(usize, ParamItem<'a>)>) -> Vec<Param<'a>> {
    let mut params: Vec<Param<'a>> = Vec::new();
    let mut seen_slash = false;
    let mut seen_star = false;
    let mut seen_default = false;
    let mut bare_star: Option<usize> = None;
    let mut after_kwargs = false;

    let add = |params: &mut Vec<Param<'a>>, index: usize, param: Param<'a>| {
        if params.iter().any(|p| p.name == param.name) {
            ctx.report(
                format!("duplicate argument '{}' in function definition", param.name),
                index,
            );
        }
        params.push(param);
    };

    for (index, item) in items {
        if after_kwargs {
            ctx.report("arguments cannot follow var-keyword argument", index);
            break;
        }
        match item {
            ParamItem::Slash => {
                if seen_slash || seen_star || params.is_empty() {
                    ctx.report("invalid syntax: unexpected '/'", index);
                }
                seen_slash = true;
                for param in &mut params {
                    param.kind = ParamKind::PositionalOnly;
                }
            }
            ParamItem::Star(var) => {
                if seen_star {
                    ctx.report("* argument may appear only once", index);
                }
                seen_star = true;
                match var {
                    Some((name, annotation)) => add(
                        &mut params,
                        index,
                        Param {
                            name,
                            annotation,
                            default: None,
                            kind: ParamKind::VarArgs,
                        },
                    ),
                    None => bare_star = Some(index),
                }
            }
            ParamItem::DoubleStar(name, annotation) => {
                after_kwargs = true;
                add(
                    &mut params,
                    index,
                    Param {
                        name,
                        annotation,
                        default: None,
                        kind: ParamKind::Kwargs,
                    },
                );
            }
            ParamItem::Plain(name, annotation, default) => {
                if seen_star {
                    bare_star = None;
                } else if default.is_some() {
                    seen_default = true;
                } else if seen_default {
                    ctx.report(
                        "parameter without a default follows parameter with a default",
                        index,
                    );
                }
                let kind = if seen_star {
                    ParamKind::KeywordOnly
                } else {
                    ParamKind::Regular
                };
                add(
                    &mut params,
                    index,
                    Param {
                        name,
                        annotation,
                        default,
                        kind,
                    },
                );
            }
        }
    }

    if let Some(index) = bare_star {
        ctx.report("named arguments must follow bare *", index);
    }
    params
}
