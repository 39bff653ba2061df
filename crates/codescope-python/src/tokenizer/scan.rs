// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::LazyLock;

use memchr::{memchr, memchr2};
use regex::Regex;
use thiserror::Error;

use crate::parser::ParserError;

/// Width a tab advances indentation to (next multiple of).
const TAB_SIZE: usize = 8;

/// Open brackets allowed at once.
const MAX_PAREN_DEPTH: usize = 200;

/// Indentation levels allowed, counting the module level.
const MAX_INDENT_DEPTH: usize = 100;

/// Strings allowed inside the replacement fields of enclosing f-strings.
const MAX_FSTRING_DEPTH: usize = 150;

const OPERATORS_3: [&str; 5] = ["**=", "//=", ">>=", "<<=", "..."];

const OPERATORS_2: [&str; 19] = [
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "@=", ":=",
];

const OPERATORS_1: &[u8] = b"+-*/%@&|^~<>()[]{},:;.=";

const STRING_PREFIXES: [&str; 11] = ["r", "u", "b", "f", "t", "br", "rb", "fr", "rf", "tr", "rt"];

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[\p{XID_Start}_]\p{XID_Continue}*").expect("identifier pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokType {
    Name,
    Number,
    String,
    Op,
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

/// Location in the source. `col` is a 0-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub col: u32,
    pub offset: usize,
}

impl Position {
    pub const START: Position = Position {
        line: 1,
        col: 0,
        offset: 0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokType,
    pub text: &'a str,
    pub start: Position,
    pub end: Position,
}

impl Token<'_> {
    /// True for tokens that stand for layout rather than source text.
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self.kind,
            TokType::Newline | TokType::Indent | TokType::Dedent | TokType::EndMarker
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated triple-quoted string literal")]
    UnterminatedTripleQuotedString,
    #[error("unindent does not match any outer indentation level")]
    Dedent,
    #[error("closing parenthesis '{close}' does not match opening parenthesis '{open}'")]
    MismatchedParen { open: char, close: char },
    #[error("unmatched '{0}'")]
    UnmatchedParen(char),
    #[error("'{0}' was never closed")]
    UnclosedParen(char),
    #[error("unexpected character after line continuation character")]
    LineContinuation,
    #[error("unexpected EOF while parsing")]
    Eof,
    #[error("invalid character '{0}'")]
    BadCharacter(char),
    #[error("too many nested parentheses")]
    TooManyNestedParens,
    #[error("too many levels of indentation")]
    TooManyIndents,
    #[error("too many nested f-strings")]
    TooManyNestedFstrings,
}

/// Tokenize a complete module.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, ParserError> {
    TokState::new(src).run()
}

struct TokState<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    indent_stack: Vec<usize>,
    parens: Vec<(u8, Position)>,
    at_line_start: bool,
    tokens: Vec<Token<'a>>,
}

impl<'a> TokState<'a> {
    fn new(src: &'a str) -> Self {
        let pos = if src.starts_with('\u{feff}') { 3 } else { 0 };
        TokState {
            src,
            bytes: src.as_bytes(),
            pos,
            line: 1,
            line_start: pos,
            indent_stack: vec![0],
            parens: Vec::new(),
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            col: (self.pos - self.line_start) as u32,
            offset: self.pos,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokType, start: Position) {
        self.tokens.push(Token {
            kind,
            text: &self.src[start.offset..self.pos],
            start,
            end: self.position(),
        });
    }

    fn fail(&self, error: TokError, at: Position) -> ParserError {
        ParserError::tokenizer(error, at)
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, ParserError> {
        loop {
            if self.at_line_start && self.parens.is_empty() && !self.indentation()? {
                continue;
            }

            let Some(b) = self.peek(0) else {
                break;
            };
            match b {
                b' ' | b'\t' | b'\x0c' => self.pos += 1,
                b'#' => self.skip_comment(),
                b'\n' | b'\r' => self.newline(),
                b'\\' => self.continuation()?,
                b'"' | b'\'' => {
                    let start = self.position();
                    self.string(start, "")?;
                }
                b'0'..=b'9' => self.number(),
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
                _ => {
                    let src = self.src;
                    let rest = &src[self.pos..];
                    match IDENTIFIER.find(rest) {
                        Some(m) => self.name(m.end())?,
                        None => self.operator(rest.chars().next().unwrap_or('\0'))?,
                    }
                }
            }
        }
        self.finish()
    }

    /// Handle the start of a physical line. Returns false if the line was blank
    /// or comment-only and has been consumed.
    fn indentation(&mut self) -> Result<bool, ParserError> {
        let line_begin = self.position();
        let mut width = 0usize;
        while let Some(b) = self.peek(0) {
            match b {
                b' ' => width += 1,
                b'\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                b'\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }

        match self.peek(0) {
            None => {
                self.at_line_start = false;
                return Ok(false);
            }
            Some(b'#') => {
                self.skip_comment();
                if self.peek(0).is_some() {
                    self.consume_newline();
                }
                return Ok(false);
            }
            Some(b'\n' | b'\r') => {
                self.consume_newline();
                return Ok(false);
            }
            _ => {}
        }

        self.at_line_start = false;
        let current = self.indent_stack.last().copied().unwrap_or(0);
        if width > current {
            if self.indent_stack.len() >= MAX_INDENT_DEPTH {
                return Err(self.fail(TokError::TooManyIndents, line_begin));
            }
            self.indent_stack.push(width);
            self.push(TokType::Indent, line_begin);
        } else if width < current {
            while self.indent_stack.last().is_some_and(|&top| top > width) {
                self.indent_stack.pop();
                let at = self.position();
                self.push(TokType::Dedent, at);
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                return Err(self.fail(TokError::Dedent, self.position()));
            }
        }
        Ok(true)
    }

    fn skip_comment(&mut self) {
        match memchr2(b'\n', b'\r', &self.bytes[self.pos..]) {
            Some(idx) => self.pos += idx,
            None => self.pos = self.bytes.len(),
        }
    }

    fn consume_newline(&mut self) {
        match self.peek(0) {
            Some(b'\r') if self.peek(1) == Some(b'\n') => self.pos += 2,
            Some(b'\r' | b'\n') => self.pos += 1,
            _ => return,
        }
        self.line += 1;
        self.line_start = self.pos;
    }

    fn newline(&mut self) {
        if !self.parens.is_empty() {
            self.consume_newline();
            return;
        }
        let start = self.position();
        let start_line = self.line;
        self.consume_newline();
        self.tokens.push(Token {
            kind: TokType::Newline,
            text: &self.src[start.offset..self.pos],
            start,
            end: Position {
                line: start_line,
                col: start.col + (self.pos - start.offset) as u32,
                offset: self.pos,
            },
        });
        self.at_line_start = true;
    }

    fn continuation(&mut self) -> Result<(), ParserError> {
        let at = self.position();
        self.pos += 1;
        match self.peek(0) {
            Some(b'\n' | b'\r') => {
                self.consume_newline();
                Ok(())
            }
            None => Err(self.fail(TokError::Eof, at)),
            Some(_) => Err(self.fail(TokError::LineContinuation, at)),
        }
    }

    /// Scan a string literal whose opening quote is at the current position.
    /// `start` is the token start, which includes `prefix`.
    fn string(&mut self, start: Position, prefix: &str) -> Result<(), ParserError> {
        self.string_body(start, prefix, 0)?;
        self.push(TokType::String, start);
        Ok(())
    }

    /// Scan from an opening quote past the closing one. `depth` counts the
    /// f-strings whose replacement fields enclose this literal.
    fn string_body(&mut self, start: Position, prefix: &str, depth: usize) -> Result<(), ParserError> {
        if depth > MAX_FSTRING_DEPTH {
            return Err(self.fail(TokError::TooManyNestedFstrings, start));
        }
        let formatted = prefix.bytes().any(|b| matches!(b, b'f' | b'F' | b't' | b'T'));
        let raw = prefix.bytes().any(|b| matches!(b, b'r' | b'R'));

        let quote = self.bytes[self.pos];
        let triple = self.bytes[self.pos..].starts_with(&[quote; 3]);
        self.pos += if triple { 3 } else { 1 };

        let unterminated = if triple {
            TokError::UnterminatedTripleQuotedString
        } else {
            TokError::UnterminatedString
        };

        loop {
            let Some(b) = self.peek(0) else {
                return Err(self.fail(unterminated, start));
            };
            match b {
                b'\\' => {
                    self.pos += 1;
                    match self.peek(0) {
                        Some(b'\n' | b'\r') => self.consume_newline(),
                        // `{` after a backslash still opens a field
                        Some(b'{') if formatted => {}
                        Some(b'N') if formatted && !raw && self.peek(1) == Some(b'{') => {
                            self.skip_named_escape()
                        }
                        Some(_) => self.pos += 1,
                        None => {}
                    }
                }
                b'\n' | b'\r' => {
                    if !triple {
                        return Err(self.fail(unterminated, start));
                    }
                    self.consume_newline();
                }
                b'{' | b'}' if formatted && self.peek(1) == Some(b) => self.pos += 2,
                b'{' if formatted => self.replacement_field(start, depth, &unterminated)?,
                q if q == quote => {
                    if !triple {
                        self.pos += 1;
                        break;
                    }
                    if self.bytes[self.pos..].starts_with(&[quote; 3]) {
                        self.pos += 3;
                        break;
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    /// Skip `N{NAME}` after a backslash.
    fn skip_named_escape(&mut self) {
        match memchr(b'}', &self.bytes[self.pos..]) {
            Some(idx) => self.pos += idx + 1,
            None => self.pos = self.bytes.len(),
        }
    }

    /// Scan an f-string replacement field from its `{` past the matching `}`.
    /// The field holds an expression, so it may contain strings with any
    /// quotes, brackets, comments and line breaks.
    fn replacement_field(
        &mut self,
        start: Position,
        depth: usize,
        unterminated: &TokError,
    ) -> Result<(), ParserError> {
        if depth > MAX_FSTRING_DEPTH {
            return Err(self.fail(TokError::TooManyNestedFstrings, self.position()));
        }
        self.pos += 1;
        let mut brackets = 0usize;
        loop {
            let Some(b) = self.peek(0) else {
                return Err(self.fail(unterminated.clone(), start));
            };
            match b {
                b'\'' | b'"' => {
                    let nested = self.position();
                    self.string_body(nested, "", depth + 1)?;
                }
                b'#' => self.skip_comment(),
                b'\n' | b'\r' => self.consume_newline(),
                b'\\' => {
                    self.pos += 1;
                    if matches!(self.peek(0), Some(b'\n' | b'\r')) {
                        self.consume_newline();
                    }
                }
                b'(' | b'[' | b'{' => {
                    brackets += 1;
                    self.pos += 1;
                }
                b')' | b']' => {
                    brackets = brackets.saturating_sub(1);
                    self.pos += 1;
                }
                b'}' if brackets > 0 => {
                    brackets -= 1;
                    self.pos += 1;
                }
                b'}' => {
                    self.pos += 1;
                    return Ok(());
                }
                b':' if brackets == 0 => {
                    self.pos += 1;
                    return self.format_spec(start, depth, unterminated);
                }
                b if b.is_ascii_alphabetic() || b == b'_' => {
                    let word_start = self.position();
                    while self
                        .peek(0)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
                    {
                        self.pos += 1;
                    }
                    let src = self.src;
                    let word = &src[word_start.offset..self.pos];
                    if matches!(self.peek(0), Some(b'"' | b'\''))
                        && STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str())
                    {
                        self.string_body(word_start, word, depth + 1)?;
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Scan a format spec up to and past the `}` closing its field. Nested
    /// fields (`{x:>{width}}`) are allowed.
    fn format_spec(
        &mut self,
        start: Position,
        depth: usize,
        unterminated: &TokError,
    ) -> Result<(), ParserError> {
        loop {
            let Some(b) = self.peek(0) else {
                return Err(self.fail(unterminated.clone(), start));
            };
            match b {
                b'{' => self.replacement_field(start, depth + 1, unterminated)?,
                b'}' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'\n' | b'\r' => self.consume_newline(),
                _ => self.pos += 1,
            }
        }
    }

    fn number(&mut self) {
        let start = self.position();
        let radix_prefixed = self.peek(0) == Some(b'0')
            && self
                .peek(1)
                .is_some_and(|c| matches!(c, b'x' | b'X' | b'o' | b'O' | b'b' | b'B'));

        while let Some(b) = self.peek(0) {
            let exponent_sign = matches!(b, b'+' | b'-')
                && !radix_prefixed
                && self.pos > start.offset
                && matches!(self.bytes[self.pos - 1], b'e' | b'E');
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokType::Number, start);
    }

    /// Scan an identifier of `len` bytes, or a string literal when the
    /// identifier is a string prefix followed by a quote.
    fn name(&mut self, len: usize) -> Result<(), ParserError> {
        let start = self.position();
        self.pos += len;

        let src = self.src;
        let word = &src[start.offset..self.pos];
        if matches!(self.peek(0), Some(b'"' | b'\''))
            && STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str())
        {
            return self.string(start, word);
        }

        self.push(TokType::Name, start);
        Ok(())
    }

    fn operator(&mut self, c: char) -> Result<(), ParserError> {
        let start = self.position();
        let src = self.src;
        let rest = &src[self.pos..];

        let len = if OPERATORS_3.iter().any(|op| rest.starts_with(op)) {
            3
        } else if OPERATORS_2.iter().any(|op| rest.starts_with(op)) {
            2
        } else if c.is_ascii() && OPERATORS_1.contains(&(c as u8)) {
            1
        } else {
            return Err(self.fail(TokError::BadCharacter(c), start));
        };

        if len == 1 {
            let b = c as u8;
            match b {
                b'(' | b'[' | b'{' => {
                    if self.parens.len() >= MAX_PAREN_DEPTH {
                        return Err(self.fail(TokError::TooManyNestedParens, start));
                    }
                    self.parens.push((b, start));
                }
                b')' | b']' | b'}' => match self.parens.pop() {
                    Some((open, _)) if matching_close(open) == b => {}
                    Some((open, _)) => {
                        return Err(self.fail(
                            TokError::MismatchedParen {
                                open: open as char,
                                close: c,
                            },
                            start,
                        ));
                    }
                    None => return Err(self.fail(TokError::UnmatchedParen(c), start)),
                },
                _ => {}
            }
        }

        self.pos += len;
        self.push(TokType::Op, start);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Token<'a>>, ParserError> {
        if let Some(&(open, at)) = self.parens.last() {
            return Err(self.fail(TokError::UnclosedParen(open as char), at));
        }

        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokType::Newline));
        let at = self.position();
        if needs_newline {
            self.push(TokType::Newline, at);
        }
        for _ in 1..self.indent_stack.len() {
            self.push(TokType::Dedent, at);
        }
        self.push(TokType::EndMarker, at);
        Ok(self.tokens)
    }
}

fn matching_close(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}
