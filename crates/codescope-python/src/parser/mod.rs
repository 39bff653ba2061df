// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Parser for Python modules.
//!
//! A PEG grammar (see `grammar.rs`) runs over the token stream and keeps only
//! the detail the structural analyzer needs (see [`ast`]).

pub mod ast;
mod errors;
mod grammar;

pub use errors::ParserError;

use std::thread;

use crate::tokenizer::{tokenize, Position};
use ast::Module;
use grammar::{python, ParseContext, TokVec};

pub type Result<T> = std::result::Result<T, ParserError>;

/// Stack for [`parse_module_with`]. The grammar recurses once per rule, so
/// bracket nesting at the tokenizer's limit needs more than a default stack.
const PARSER_STACK_SIZE: usize = 64 * 1024 * 1024;

const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Parse a complete module on the current thread.
///
/// ```
/// use codescope_python::parser::{ast::Stmt, parse_module};
///
/// let module = parse_module("import os\n\ndef main():\n    pass\n").unwrap();
/// assert_eq!(module.body.len(), 2);
/// assert!(matches!(module.body[1], Stmt::FunctionDef(_)));
/// ```
pub fn parse_module(src: &str) -> Result<Module<'_>> {
    let tokens = TokVec::from(tokenize(src)?);
    let ctx = ParseContext::new(tokens.as_slice());
    let parsed = python::file(&tokens, &ctx);
    let reported = ctx.first_error();
    match parsed {
        Ok(module) => match reported {
            Some(err) => Err(err),
            None => Ok(module),
        },
        Err(err) => {
            let syntax = ParserError::from_grammar(tokens.as_slice(), &err);
            Err(match reported {
                Some(first) if first.offset() < syntax.offset() => first,
                _ => syntax,
            })
        }
    }
}

/// Parse `src` and pass the module to `inspect`, on a dedicated thread with a
/// large stack. The tree is built, inspected and dropped on that thread.
pub fn parse_module_with<R, F>(src: &str, inspect: F) -> Result<R>
where
    F: FnOnce(&Module<'_>) -> R + Send,
    R: Send,
{
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("python-parser".to_string())
            .stack_size(PARSER_STACK_SIZE)
            .spawn_scoped(scope, move || parse_module(src).map(|module| inspect(&module)))
            .map_err(|e| {
                ParserError::syntax(format!("could not start parser: {}", e), Position::START)
            })?;
        worker
            .join()
            .unwrap_or_else(|_| Err(ParserError::syntax("parser panicked", Position::START)))
    })
}

#[cfg(test)]
mod tests;
