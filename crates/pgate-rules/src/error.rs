//! Errors raised while rendering a decision.
//!
//! Evaluation itself cannot fail: a violated rule is a `RuleResult` with
//! result `fail`. Only serialization of the finished record can error.

use thiserror::Error;

/// Error writing out a decision record.
#[derive(Debug, Error)]
pub enum RuleError {
    /// JSON serialization failed.
    #[error("failed to serialize decision: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias.
pub type RulesResult<T> = Result<T, RuleError>;
