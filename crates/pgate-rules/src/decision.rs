//! # Decision Record
//!
//! The single output of a run and the contract for downstream reporting
//! and audit storage. Field order is fixed by the struct layout, so two
//! runs over identical inputs serialize byte-identically.
//!
//! ## Status
//!
//! `failed` if any block rule has result `fail` and is not waived; else
//! `passed_with_warnings` if any result is not `pass`; else `passed`.
//!
//! ## Score
//!
//! Starts at 50. Per rule: block+pass +10, block+other −20, warn+pass +5,
//! warn+other 0, info ignored. Clamped to 0..=100. The score never gates.

use serde::{Deserialize, Serialize};

use pgate_core::{RuleOutcome, RuleSeverity, Timestamp};
use pgate_policy::{Mode, Waiver};

use crate::error::RulesResult;
use crate::result::RuleResult;

const SCORE_START: i64 = 50;

/// Overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Every rule passed.
    Passed,
    /// Nothing blocks, but some rule warned, was skipped or was waived.
    PassedWithWarnings,
    /// An unwaived blocking rule did not pass.
    Failed,
}

impl DecisionStatus {
    /// Snake-case label, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::PassedWithWarnings => "passed_with_warnings",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMeta {
    /// Version of the engine that produced the record.
    pub engine_version: String,
    /// `sha256:<hex>` of the effective policy's canonical bytes.
    pub policy_digest: String,
    /// Effective mode.
    pub mode: Mode,
    /// Branch named by the evidence context.
    pub branch: Option<String>,
    /// Target environment named by the evidence context.
    pub environment: Option<String>,
    /// Number of rules evaluated.
    pub rule_count: usize,
    /// Advisory mode turned a `failed` status into `passed_with_warnings`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub advisory_downgrade: bool,
}

/// One run's decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Overall verdict.
    pub status: DecisionStatus,
    /// 0 to 100.
    pub score: u8,
    /// Per-rule results in policy-declared order.
    pub rules: Vec<RuleResult>,
    /// Waivers applied to failing rules, in rule order.
    pub waivers_used: Vec<Waiver>,
    /// Ids of rules that reported missing evidence.
    pub missing_evidence: Vec<String>,
    /// Evaluation time supplied by the caller.
    pub timestamp: Timestamp,
    /// `version` of the effective policy.
    pub policy_version: Option<String>,
    /// Run metadata.
    pub meta: DecisionMeta,
}

impl Decision {
    /// The record a downstream gate should stop on.
    pub fn is_failed(&self) -> bool {
        self.status == DecisionStatus::Failed
    }

    /// Look up a rule result by id.
    pub fn rule(&self, id: &str) -> Option<&RuleResult> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Pretty JSON, fields in declaration order.
    pub fn to_json_pretty(&self) -> RulesResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Overall status from per-rule results, before any advisory downgrade.
pub fn compute_status(rules: &[RuleResult]) -> DecisionStatus {
    if rules.iter().any(RuleResult::is_blocking) {
        DecisionStatus::Failed
    } else if rules.iter().any(RuleResult::is_degraded) {
        DecisionStatus::PassedWithWarnings
    } else {
        DecisionStatus::Passed
    }
}

/// Heuristic score in 0..=100.
pub fn compute_score(rules: &[RuleResult]) -> u8 {
    let total = rules.iter().fold(SCORE_START, |acc, r| {
        let passed = r.result == RuleOutcome::Pass;
        acc + match (r.severity, passed) {
            (RuleSeverity::Block, true) => 10,
            (RuleSeverity::Block, false) => -20,
            (RuleSeverity::Warn, true) => 5,
            (RuleSeverity::Warn, false) => 0,
            (RuleSeverity::Info, _) => 0,
        }
    });
    total.clamp(0, 100) as u8
}
