//! # Rule Evaluators
//!
//! One module per evidence domain. Each exposes
//! `evaluate(&RuleContext) -> RuleResult` and returns the raw result;
//! waivers are applied afterwards by [`evaluate_rule`].
//!
//! Dispatch is an exhaustive match on [`RuleKind`], so a new kind does not
//! compile until it has an evaluator.

pub mod adr;
pub mod artifacts;
pub mod coverage;
pub mod reviews;
pub mod security;
pub mod test_status;

use pgate_core::{RuleKind, RuleOutcome, RuleSeverity};

use crate::context::RuleContext;
use crate::result::RuleResult;
use crate::waiver;

/// Evaluate one rule and apply its active waivers.
pub fn evaluate_rule(ctx: &RuleContext<'_>) -> RuleResult {
    let raw = match ctx.kind {
        RuleKind::TestsGreen => test_status::evaluate(ctx),
        RuleKind::CoverageMin => coverage::evaluate(ctx),
        RuleKind::SecuritySast => security::evaluate(ctx, security::Scanner::Sast),
        RuleKind::SecuritySca => security::evaluate(ctx, security::Scanner::Sca),
        RuleKind::ReviewsBranch => reviews::evaluate(ctx),
        RuleKind::AdrRequired => adr::evaluate(ctx),
        RuleKind::ArtifactIntegrity => artifacts::evaluate(ctx),
        RuleKind::Unknown => unknown(ctx),
    };
    tracing::debug!(
        rule = ctx.rule_id,
        kind = %ctx.kind,
        result = %raw.result,
        "rule evaluated"
    );
    waiver::apply(raw, &ctx.active_waivers)
}

/// Placeholder for an id missing from the rule table. Always `warn` at
/// `warn` severity so a typo can never block a run.
fn unknown(ctx: &RuleContext<'_>) -> RuleResult {
    tracing::warn!(rule = ctx.rule_id, "unknown rule id, not evaluated");
    RuleResult::new(
        ctx.rule_id,
        RuleSeverity::Warn,
        RuleOutcome::Warn,
        format!("unknown rule id '{}'; not evaluated", ctx.rule_id),
    )
}

/// Render a percentage without trailing zeros (`80`, `78.5`).
pub(crate) fn pct(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}


#[cfg(test)]
mod dispatch_tests {
    use super::fixture::*;
    use super::*;
    use pgate_core::Timestamp;
    use pgate_policy::Waiver;
    use serde_json::json;

    #[test]
    fn test_unknown_rule_is_non_blocking_warn() {
        let p = policy(json!({}));
        let e = evidence(json!({}));
        let ctx = RuleContext::new("security.dast", block(), &p, &e);
        let r = evaluate_rule(&ctx);
        assert_eq!(r.result, RuleOutcome::Warn);
        assert_eq!(r.severity, RuleSeverity::Warn);
        assert!(!r.is_blocking());
        assert!(!r.missing_evidence);
    }

    #[test]
    fn test_waiver_applies_to_any_kind() {
        let p = policy(json!({}));
        let e = evidence(json!({"tests": {"status": "red", "failed": 3}}));
        let w = Waiver {
            rule: "tests.green".to_string(),
            scope: None,
            reason: Some("flaky suite quarantined".to_string()),
            ttl: "2099-01-01".to_string(),
            approver: None,
            evidence: None,
        };
        let list = vec![w];
        let now = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let active = waiver::active_waivers_for_rule(&list, "tests.green", &now);
        let ctx = RuleContext::new("tests.green", block(), &p, &e).with_waivers(active);
        let r = evaluate_rule(&ctx);
        assert_eq!(r.result, RuleOutcome::FailWaived);
        assert!(r.waived);
    }

    #[test]
    fn test_pct_formatting() {
        assert_eq!(pct(80.0), "80");
        assert_eq!(pct(78.5), "78.5");
        assert_eq!(pct(80.1 - 80.0), "0.1");
    }
}
