//! Evidence error types.

use std::path::PathBuf;

use thiserror::Error;

use pgate_schema::{SchemaValidationError, ValidationViolations};

/// Errors from loading evidence. Any of these aborts the run before
/// evaluation.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// File or directory missing, unreadable or unparsable.
    #[error("failed to load evidence from {path}: {reason}")]
    Load {
        /// Offending path.
        path: PathBuf,
        /// Loader diagnostic.
        reason: String,
    },

    /// The bundle does not conform to the evidence schema.
    #[error("{origin} failed schema validation:\n{violations}")]
    Schema {
        /// Path of the bundle or directory.
        origin: String,
        /// Every violation.
        violations: ValidationViolations,
    },

    /// The bundle passed the schema but not the typed model.
    #[error("{origin} does not match the evidence model: {reason}")]
    Model {
        /// Path of the bundle or directory.
        origin: String,
        /// Deserializer diagnostic.
        reason: String,
    },

    /// The schema validator itself failed.
    #[error("schema validator error: {0}")]
    Validator(#[from] SchemaValidationError),
}

/// Result alias for evidence operations.
pub type EvidenceResult<T> = Result<T, EvidenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_names_path() {
        let err = EvidenceError::Load {
            path: PathBuf::from("out/evidence"),
            reason: "not a directory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("out/evidence"));
        assert!(msg.contains("not a directory"));
    }

    #[test]
    fn model_error_names_origin() {
        let err = EvidenceError::Model {
            origin: "evidence.json".to_string(),
            reason: "invalid type".to_string(),
        };
        assert!(err.to_string().starts_with("evidence.json"));
    }
}
