//! Error types and error code constants for codescope.
//!
//! Each stage has its own error enum; this module provides the unified
//! [`CodescopeError`] that stage errors are bridged into before being rendered
//! as JSON output by the CLI.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Path not found (missing project root, test directory, config)
//! - `4`: I/O failure fatal to a stage (output directory, report write)
//! - `5`: Decode failure (malformed data passed between stages)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Parse errors never appear here: a malformed source file is downgraded to a
//! failure record in the analysis output.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes used as CLI exit codes and in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// A required path does not exist.
    PathNotFound = 3,
    /// Stage-level I/O failure.
    IoError = 4,
    /// Malformed intermediate data.
    DecodeError = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for stage-level failures.
#[derive(Debug, Error)]
pub enum CodescopeError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// A required path does not exist.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// I/O failure that is fatal to a stage.
    #[error("IO error{}: {message}", .path.as_ref().map(|p| format!(" at {}", p)).unwrap_or_default())]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Intermediate data could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<&CodescopeError> for OutputErrorCode {
    fn from(err: &CodescopeError) -> Self {
        match err {
            CodescopeError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            CodescopeError::PathNotFound { .. } => OutputErrorCode::PathNotFound,
            CodescopeError::Io { .. } => OutputErrorCode::IoError,
            CodescopeError::Decode { .. } => OutputErrorCode::DecodeError,
            CodescopeError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<std::io::Error> for CodescopeError {
    fn from(err: std::io::Error) -> Self {
        CodescopeError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for CodescopeError {
    fn from(err: serde_json::Error) -> Self {
        CodescopeError::Decode {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl CodescopeError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        CodescopeError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn path_not_found(path: impl Into<String>) -> Self {
        CodescopeError::PathNotFound { path: path.into() }
    }

    /// Create an I/O error tied to a path.
    pub fn io_at(path: impl Into<String>, message: impl Into<String>) -> Self {
        CodescopeError::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        CodescopeError::Decode {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CodescopeError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
