//! # Decision Engine
//!
//! Evaluates every rule declared in the effective policy, in declared
//! order, and aggregates the results into a [`Decision`].
//!
//! Waivers come from two places: those embedded in the policy and those
//! supplied for the run. Both lists are consulted, policy first.
//!
//! ## Determinism
//!
//! The engine reads the clock only through its `now` argument. Rule order
//! is the policy's declared order, waiver order is list order, and every
//! map in the output preserves insertion order.

use pgate_core::Timestamp;
use pgate_evidence::EvidenceBundle;
use pgate_policy::{EffectivePolicy, Mode, Waiver};

use crate::context::RuleContext;
use crate::decision::{compute_score, compute_status, Decision, DecisionMeta, DecisionStatus};
use crate::evaluators::evaluate_rule;
use crate::result::RuleResult;
use crate::waiver::{active_waivers_for_rule, is_active};

/// Version string recorded in `meta.engine_version`.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Evaluates one effective policy. Holds no mutable state, so one engine
/// may evaluate any number of evidence bundles.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine<'p> {
    policy: &'p EffectivePolicy,
}

impl<'p> DecisionEngine<'p> {
    /// Engine over `policy`.
    pub fn new(policy: &'p EffectivePolicy) -> Self {
        Self { policy }
    }

    /// Policy waivers followed by run waivers.
    fn all_waivers(&self, waivers: &[Waiver]) -> Vec<Waiver> {
        self.policy
            .waivers()
            .iter()
            .chain(waivers.iter())
            .cloned()
            .collect()
    }

    /// Evaluate every declared rule, in declared order. Returns the
    /// results and the waivers applied, deduplicated, in rule order.
    pub fn evaluate_rules(
        &self,
        evidence: &EvidenceBundle,
        waivers: &[Waiver],
        now: &Timestamp,
    ) -> (Vec<RuleResult>, Vec<Waiver>) {
        let all_waivers = self.all_waivers(waivers);
        let document = self.policy.document();
        let mut results = Vec::with_capacity(self.policy.rules().len());
        let mut used: Vec<Waiver> = Vec::new();

        for (rule_id, declaration) in self.policy.rules() {
            let active = active_waivers_for_rule(&all_waivers, rule_id, now);
            let applied: Vec<Waiver> = active.iter().map(|w| (*w).clone()).collect();
            let ctx = RuleContext::new(rule_id, *declaration, document, evidence)
                .with_waivers(active);
            let result = evaluate_rule(&ctx);

            if result.waived {
                for w in applied {
                    if !used.contains(&w) {
                        used.push(w);
                    }
                }
            } else if result.result.is_failure() {
                let expired = all_waivers
                    .iter()
                    .filter(|w| w.rule == *rule_id && !is_active(w, now))
                    .count();
                if expired > 0 {
                    tracing::warn!(
                        rule = %rule_id,
                        expired,
                        "matching waivers are expired or invalid"
                    );
                }
            }
            results.push(result);
        }
        (results, used)
    }

    /// Evaluate and aggregate into a decision stamped with `now`.
    pub fn evaluate(
        &self,
        evidence: &EvidenceBundle,
        waivers: &[Waiver],
        now: Timestamp,
    ) -> Decision {
        let (rules, waivers_used) = self.evaluate_rules(evidence, waivers, &now);

        let missing_evidence: Vec<String> = rules
            .iter()
            .filter(|r| r.missing_evidence)
            .map(|r| r.id.clone())
            .collect();

        let mode = self.policy.mode();
        let mut status = compute_status(&rules);
        let mut advisory_downgrade = false;
        if mode == Mode::Advisory && status == DecisionStatus::Failed {
            status = DecisionStatus::PassedWithWarnings;
            advisory_downgrade = true;
        }
        let score = compute_score(&rules);

        let meta = DecisionMeta {
            engine_version: ENGINE_VERSION.to_string(),
            policy_digest: self.policy.digest().to_string(),
            mode,
            branch: evidence.branch().map(str::to_string),
            environment: evidence.environment().map(str::to_string),
            rule_count: rules.len(),
            advisory_downgrade,
        };

        tracing::info!(
            status = %status,
            score,
            rules = rules.len(),
            waivers_used = waivers_used.len(),
            missing_evidence = missing_evidence.len(),
            advisory_downgrade,
            "evaluation complete"
        );

        Decision {
            status,
            score,
            rules,
            waivers_used,
            missing_evidence,
            timestamp: now,
            policy_version: self.policy.version(),
            meta,
        }
    }
}

/// Evaluate `policy` against `evidence` with `waivers` at `now`.
pub fn evaluate(
    policy: &EffectivePolicy,
    evidence: &EvidenceBundle,
    waivers: &[Waiver],
    now: Timestamp,
) -> Decision {
    DecisionEngine::new(policy).evaluate(evidence, waivers, now)
}
