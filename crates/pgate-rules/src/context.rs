//! Evaluation context handed to every rule evaluator.

use pgate_core::{RuleKind, RuleOutcome};
use pgate_evidence::EvidenceBundle;
use pgate_policy::{PolicyDocument, RuleDeclaration, Waiver};

use crate::result::RuleResult;

/// Everything one evaluator may read. The effective policy is passed in
/// explicitly; evaluators hold no other state.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    /// Rule id as declared.
    pub rule_id: &'a str,
    /// Kind resolved from the id.
    pub kind: RuleKind,
    /// Declared severity and evidence requirement.
    pub declaration: RuleDeclaration,
    /// Typed effective policy.
    pub policy: &'a PolicyDocument,
    /// Evidence for this run.
    pub evidence: &'a EvidenceBundle,
    /// Active waivers whose `rule` equals `rule_id`.
    pub active_waivers: Vec<&'a Waiver>,
}

impl<'a> RuleContext<'a> {
    /// Context with no waivers.
    pub fn new(
        rule_id: &'a str,
        declaration: RuleDeclaration,
        policy: &'a PolicyDocument,
        evidence: &'a EvidenceBundle,
    ) -> Self {
        Self {
            rule_id,
            kind: RuleKind::from_id(rule_id),
            declaration,
            policy,
            evidence,
            active_waivers: Vec::new(),
        }
    }

    /// Attach the active waivers for this rule.
    pub fn with_waivers(mut self, waivers: Vec<&'a Waiver>) -> Self {
        self.active_waivers = waivers;
        self
    }

    /// Result carrying this rule's id and declared severity.
    pub fn result(&self, outcome: RuleOutcome, message: impl Into<String>) -> RuleResult {
        RuleResult::new(self.rule_id, self.declaration.severity, outcome, message)
    }

    /// `pass` result.
    pub fn pass(&self, message: impl Into<String>) -> RuleResult {
        self.result(RuleOutcome::Pass, message)
    }

    /// `fail` result.
    pub fn fail(&self, message: impl Into<String>) -> RuleResult {
        self.result(RuleOutcome::Fail, message)
    }

    /// `skip` result: the rule does not apply to this run.
    pub fn skip(&self, message: impl Into<String>) -> RuleResult {
        self.result(RuleOutcome::Skip, message)
    }

    /// No evidence to judge: `fail` when the rule requires evidence,
    /// otherwise `warn`.
    pub fn missing(&self, what: &str) -> RuleResult {
        let outcome = if self.declaration.requires_evidence {
            RuleOutcome::Fail
        } else {
            RuleOutcome::Warn
        };
        let mut result = self.result(outcome, format!("missing evidence: {what}"));
        result.missing_evidence = true;
        result
    }
}
