//! Python language support for codescope.
//!
//! - [`files`]: discover `.py` files under a project root
//! - [`tokenizer`] and [`parser`]: turn source text into a syntax tree
//! - [`analyzer`]: extract the structural model of a module
//! - [`testgen`]: write pytest skeletons from analysis records

pub mod analyzer;
pub mod files;
pub mod parser;
pub mod testgen;
pub mod tokenizer;

// Converts stage errors to CodescopeError
mod error_bridges;
