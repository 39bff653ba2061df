//! Core infrastructure for codescope.
//!
//! This crate provides the language-agnostic parts of the pipeline:
//! - Structural model records exchanged between stages
//! - Test execution results and the result-parser seam
//! - Markdown report assembly
//! - Error types and error codes
//! - JSON output types for CLI responses

pub mod error;
pub mod execution;
pub mod model;
pub mod output;
pub mod report;
