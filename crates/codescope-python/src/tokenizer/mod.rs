// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Python tokenizer.
//!
//! Produces the token stream consumed by the parser: names, numbers, strings,
//! operators, and the synthetic `Newline`/`Indent`/`Dedent`/`EndMarker`
//! tokens. Blank and comment-only lines produce no tokens, and newlines inside
//! brackets are implicit line joins.

mod scan;

pub use scan::{tokenize, Position, TokError, TokType, Token};
