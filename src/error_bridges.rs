//! Error bridge implementations for front-door errors.
//!
//! This module provides `impl From<X> for CodescopeError` conversions for the
//! configuration and test execution errors defined in this crate. Collector
//! and generator errors are bridged in `codescope-python`.

use std::io;

use codescope_core::error::CodescopeError;

use crate::config::ConfigError;
use crate::runner::ExecutorError;

// ============================================================================
// Bridge: ExecutorError -> CodescopeError
// ============================================================================

impl From<ExecutorError> for CodescopeError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::TestDirNotFound { path } => CodescopeError::PathNotFound { path },
            ExecutorError::EmptyCommand | ExecutorError::MissingVariable { .. } => {
                CodescopeError::invalid_args(err.to_string())
            }
            ExecutorError::Io(io_err) => CodescopeError::from(io_err),
        }
    }
}

// ============================================================================
// Bridge: ConfigError -> CodescopeError
// ============================================================================

impl From<ConfigError> for CodescopeError {
    fn from(err: ConfigError) -> Self {
        match &err {
            ConfigError::Read { path, source } if source.kind() == io::ErrorKind::NotFound => {
                CodescopeError::path_not_found(path.display().to_string())
            }
            ConfigError::Read { path, .. } => {
                CodescopeError::io_at(path.display().to_string(), err.to_string())
            }
            ConfigError::Parse { .. } => CodescopeError::invalid_args(err.to_string()),
        }
    }
}
