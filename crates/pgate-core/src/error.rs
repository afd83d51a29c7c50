//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types shared across the workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Parse errors for ordered scales name the rejected label and the scale.
//! - Rule failures are never errors: they are encoded as `RuleOutcome::Fail`
//!   inside the decision record.

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum PgateError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A label could not be parsed onto one of the ordered scales.
    #[error("unknown {scale} value {value:?} (expected one of: {expected})")]
    UnknownLabel {
        /// Name of the scale (e.g. `"threshold"`).
        scale: &'static str,
        /// The rejected input.
        value: String,
        /// Comma-separated list of accepted labels.
        expected: &'static str,
    },

    /// A timestamp or date string could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted to a JSON value tree.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_label_display_names_value_and_scale() {
        let err = PgateError::UnknownLabel {
            scale: "threshold",
            value: "no-medium".to_string(),
            expected: "none, no-critical, no-high",
        };
        let msg = err.to_string();
        assert!(msg.contains("threshold"));
        assert!(msg.contains("no-medium"));
        assert!(msg.contains("no-critical"));
    }

    #[test]
    fn invalid_timestamp_display() {
        let err = PgateError::InvalidTimestamp {
            value: "yesterday".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "policy.yaml");
        let err = PgateError::from(io_err);
        assert!(err.to_string().contains("policy.yaml"));
    }
}
