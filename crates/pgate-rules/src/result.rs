//! # Rule Results
//!
//! One `RuleResult` per declared rule per run. Evaluators build it through
//! [`crate::RuleContext`]; after that only waiver application touches it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pgate_core::{RuleOutcome, RuleSeverity};

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule id as declared in the policy.
    pub id: String,
    /// Declared blocking weight.
    pub severity: RuleSeverity,
    /// Result label.
    pub result: RuleOutcome,
    /// Human-readable explanation.
    pub message: String,
    /// Facts the evaluator looked at.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub evidence: Value,
    /// The evaluator found no evidence to judge.
    pub missing_evidence: bool,
    /// A waiver covers this failure.
    pub waived: bool,
    /// Which configuration entry resolved the rule (e.g. a branch pattern).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RuleResult {
    /// A result with no evidence attached.
    pub fn new(
        id: impl Into<String>,
        severity: RuleSeverity,
        result: RuleOutcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            result,
            message: message.into(),
            evidence: Value::Null,
            missing_evidence: false,
            waived: false,
            source: None,
        }
    }

    /// Attach the facts the evaluator used.
    pub fn with_evidence(mut self, evidence: Value) -> Self {
        self.evidence = evidence;
        self
    }

    /// Record the configuration entry that resolved the rule.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Unwaived failure of a block rule.
    pub fn is_blocking(&self) -> bool {
        self.severity == RuleSeverity::Block && self.result == RuleOutcome::Fail && !self.waived
    }

    /// Anything other than a clean pass.
    pub fn is_degraded(&self) -> bool {
        self.result != RuleOutcome::Pass
    }
}
