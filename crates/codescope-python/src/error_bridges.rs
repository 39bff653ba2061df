//! Error bridge implementations for Python stage errors.
//!
//! Provides `impl From<X> for CodescopeError` for the collector and test
//! generator errors. They live here rather than in `codescope-core` because
//! core does not know about the Python stages.

use codescope_core::error::CodescopeError;

use crate::files::CollectError;
use crate::testgen::GenerateError;

// ============================================================================
// Bridge: CollectError -> CodescopeError
// ============================================================================

impl From<CollectError> for CodescopeError {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::PathNotFound { path } => CodescopeError::PathNotFound { path },
            CollectError::Io(io_err) => CodescopeError::from(io_err),
        }
    }
}

// ============================================================================
// Bridge: GenerateError -> CodescopeError
// ============================================================================

impl From<GenerateError> for CodescopeError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::AnalysisDecode(json_err) => CodescopeError::decode(format!(
                "Error generating test files: {}",
                json_err
            )),
            GenerateError::OutputDir { path, source } => {
                CodescopeError::io_at(path.display().to_string(), source.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codescope_core::error::OutputErrorCode;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn collect_errors_keep_their_codes() {
        let err = CodescopeError::from(CollectError::PathNotFound {
            path: "proj".to_string(),
        });
        assert_eq!(err.error_code(), OutputErrorCode::PathNotFound);
        assert_eq!(err.to_string(), "path not found: proj");

        let err = CodescopeError::from(CollectError::Io(io::Error::other("denied")));
        assert_eq!(err.error_code(), OutputErrorCode::IoError);
    }

    #[test]
    fn generate_errors_keep_their_codes() {
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = CodescopeError::from(GenerateError::AnalysisDecode(json_err));
        assert_eq!(err.error_code(), OutputErrorCode::DecodeError);
        assert!(err.to_string().contains("Error generating test files"));

        let err = CodescopeError::from(GenerateError::OutputDir {
            path: PathBuf::from("out"),
            source: io::Error::other("read-only"),
        });
        assert_eq!(err.error_code(), OutputErrorCode::IoError);
        assert!(err.to_string().contains("at out"));
    }
}
