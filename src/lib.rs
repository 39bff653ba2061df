//! Codescope: structural analysis, pytest skeletons and documentation reports
//! for Python projects.
//!
//! The pipeline collects a project's Python files, extracts a structural model
//! of each module, writes heuristic pytest skeletons, runs them, and assembles
//! a Markdown report from the analysis and the test results.

// Core infrastructure - re-exported from codescope-core
pub use codescope_core::error;
pub use codescope_core::execution;
pub use codescope_core::model;
pub use codescope_core::output;
pub use codescope_core::report;

// Python stages - re-exported from codescope-python
pub use codescope_python::analyzer;
pub use codescope_python::files;
pub use codescope_python::testgen;

// Front door
pub mod config;
pub mod pipeline;
pub mod runner;
pub mod toolkit;

// Error bridges - converts front-door errors to CodescopeError
mod error_bridges;
