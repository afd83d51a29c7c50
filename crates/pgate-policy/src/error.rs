//! Policy error types.
//!
//! Loading, schema and merge failures all surface before any rule is
//! evaluated. Merge failures carry every violation so a caller can print one
//! line per offending field.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use pgate_core::CanonicalizationError;
use pgate_schema::{SchemaValidationError, ValidationViolations, Violation};

use crate::constraints::ConstraintViolation;

/// A schema violation tagged with the document it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentViolation {
    /// `base`, `override`, or a file path.
    pub document: String,
    /// The violation.
    pub violation: Violation,
}

impl fmt::Display for DocumentViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.document, self.violation)
    }
}

/// Why a merge was refused.
#[derive(Debug, Error)]
pub enum MergeError {
    /// One or both inputs failed schema validation. Nothing was merged.
    #[error("{} schema violation(s) in policy inputs", violations.len())]
    Schema {
        /// Every violation from both documents.
        violations: Vec<DocumentViolation>,
    },

    /// The override relaxed one or more non-relaxable fields.
    #[error("{} non-relaxable constraint violation(s)", violations.len())]
    Constraint {
        /// Every weakened field.
        violations: Vec<ConstraintViolation>,
    },

    /// The merged document could not be turned into an effective policy.
    #[error("merged policy is invalid: {0}")]
    Effective(String),

    /// The schema validator itself failed (schema missing or not compiling).
    #[error("schema validator error: {0}")]
    Validator(#[from] SchemaValidationError),
}

impl MergeError {
    /// One human-readable line per violation.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Schema { violations } => violations.iter().map(ToString::to_string).collect(),
            Self::Constraint { violations } => {
                violations.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

/// Errors from loading policies and waiver lists.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The file is missing, unreadable or does not parse.
    #[error("failed to load {path}: {reason}")]
    Load {
        /// Offending file.
        path: PathBuf,
        /// Loader diagnostic.
        reason: String,
    },

    /// The document does not conform to its schema.
    #[error("{origin} failed schema validation:\n{violations}")]
    Schema {
        /// File path or label of the document.
        origin: String,
        /// Every violation.
        violations: ValidationViolations,
    },

    /// The document passed the schema but not the typed model.
    #[error("{origin} does not match the policy model: {reason}")]
    Model {
        /// File path or label of the document.
        origin: String,
        /// Deserializer diagnostic.
        reason: String,
    },

    /// The schema validator itself failed.
    #[error("schema validator error: {0}")]
    Validator(#[from] SchemaValidationError),

    /// Merge refused.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Canonical serialization failed while computing the policy digest.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Rendering the effective policy failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
