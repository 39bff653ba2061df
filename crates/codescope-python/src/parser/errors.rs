// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use peg::error::ParseError;
use peg::Parse;
use thiserror::Error;

use super::grammar::TokVec;
use crate::tokenizer::{Position, TokError, TokType, Token};

/// Expectations listed in a message; a longer set reads as "invalid syntax".
const MAX_EXPECTED_SHOWN: usize = 4;

type GrammarError<'a> = ParseError<<TokVec<'a> as Parse>::PositionRepr>;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("{error} (line {line}, column {col})")]
    TokenizerError {
        error: TokError,
        line: u32,
        col: u32,
        offset: usize,
    },
    #[error("{message} (line {line}, column {col})")]
    ParserError {
        message: String,
        line: u32,
        col: u32,
        offset: usize,
    },
}

impl ParserError {
    pub(crate) fn tokenizer(error: TokError, at: Position) -> Self {
        ParserError::TokenizerError {
            error,
            line: at.line,
            col: at.col + 1,
            offset: at.offset,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, at: Position) -> Self {
        ParserError::ParserError {
            message: message.into(),
            line: at.line,
            col: at.col + 1,
            offset: at.offset,
        }
    }

    /// 1-based line of the failure.
    pub fn line(&self) -> u32 {
        match self {
            ParserError::TokenizerError { line, .. } | ParserError::ParserError { line, .. } => {
                *line
            }
        }
    }

    /// Byte offset of the failure in the source.
    pub fn offset(&self) -> usize {
        match self {
            ParserError::TokenizerError { offset, .. }
            | ParserError::ParserError { offset, .. } => *offset,
        }
    }

    /// Short label without the position suffix.
    pub fn label(&self) -> String {
        match self {
            ParserError::TokenizerError { error, .. } => error.to_string(),
            ParserError::ParserError { message, .. } => message.clone(),
        }
    }

    /// Describe where and why the grammar failed.
    pub(crate) fn from_grammar(tokens: &[Token<'_>], err: &GrammarError<'_>) -> Self {
        let mut expected: Vec<&str> = err.expected.tokens().collect();
        expected.sort_unstable();
        expected.dedup();

        let found = tokens.get(err.location.index).or(tokens.last());
        let message = match found {
            Some(tok) if tok.kind == TokType::Indent => "unexpected indent".to_string(),
            _ if expected.contains(&"INDENT") => "expected an indented block".to_string(),
            _ if expected.is_empty() || expected.len() > MAX_EXPECTED_SHOWN => {
                "invalid syntax".to_string()
            }
            Some(tok) if !tok.is_synthetic() => format!(
                "invalid syntax: expected {}, found '{}'",
                describe_expected(&expected),
                tok.text
            ),
            _ => format!("expected {}", describe_expected(&expected)),
        };
        ParserError::syntax(message, err.location.start)
    }
}

fn describe_expected(expected: &[&str]) -> String {
    let quoted: Vec<String> = expected
        .iter()
        // Literal tokens arrive in double quotes, token classes bare
        .map(|e| match e.strip_prefix('"').and_then(|e| e.strip_suffix('"')) {
            Some(text) => format!("'{}'", text),
            None => e.to_string(),
        })
        .collect();
    match quoted.as_slice() {
        [single] => single.clone(),
        _ => format!("one of {}", quoted.join(", ")),
    }
}
