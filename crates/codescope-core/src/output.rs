//! JSON output envelope for CLI responses.
//!
//! Every stage result printed by the CLI goes through [`emit_response`], so the
//! output is deterministic pretty-printed JSON. Errors use [`ErrorResponse`]
//! with the stable codes from [`OutputErrorCode`].

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{CodescopeError, OutputErrorCode};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Error details in an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
}

impl ErrorInfo {
    pub fn from_error(err: &CodescopeError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(err: &CodescopeError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Success response envelope wrapping a stage result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse<T> {
    /// Always "ok".
    pub status: String,
    pub schema_version: String,
    /// Stage that produced the result (e.g. "analyze").
    pub stage: String,
    pub result: T,
}

impl<T> StageResponse<T> {
    pub fn new(stage: impl Into<String>, result: T) -> Self {
        StageResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            stage: stage.into(),
            result,
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
///
/// The output is deterministic: same input produces identical bytes.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_carries_code_and_message() {
        let err = CodescopeError::path_not_found("proj");
        let mut buf = Vec::new();
        emit_response(&ErrorResponse::new(&err), &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("\"status\": \"error\""));
        assert!(out.contains("\"code\": 3"));
        assert!(out.contains("path not found: proj"));
    }

    #[test]
    fn stage_response_is_deterministic() {
        let response = StageResponse::new("collect", vec!["a.py", "b.py"]);
        let mut first = Vec::new();
        let mut second = Vec::new();
        emit_response(&response, &mut first).unwrap();
        emit_response(&response, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn compact_output_is_single_line() {
        let response = StageResponse::new("report", 1);
        let mut buf = Vec::new();
        emit_response_compact(&response, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.lines().count(), 1);
    }
}
