//! `coverage.min`: coverage floor and, when a baseline is known, the
//! minimum change against it.
//!
//! The floor is `tests.coverage_min` (0 when unset). The delta check only
//! runs when both `coverage.baseline` and `tests.coverage_delta_min` are
//! present. Deltas are compared at two-decimal precision.

use serde_json::json;

use crate::context::RuleContext;
use crate::evaluators::pct;
use crate::result::RuleResult;

/// Evaluate `coverage.min`.
pub fn evaluate(ctx: &RuleContext<'_>) -> RuleResult {
    let Some((coverage, current)) = ctx
        .evidence
        .coverage
        .as_ref()
        .and_then(|c| c.current.map(|current| (c, current)))
    else {
        return ctx.missing("coverage percentage");
    };

    let min = ctx.policy.tests.coverage_min.unwrap_or(0.0);
    let delta_min = ctx.policy.tests.coverage_delta_min;
    let delta = coverage
        .baseline
        .map(|baseline| ((current - baseline) * 100.0).round() / 100.0);

    let mut reasons: Vec<String> = Vec::new();
    if current < min {
        reasons.push(format!(
            "coverage {}% is below the minimum of {}%",
            pct(current),
            pct(min)
        ));
    }
    if let (Some(delta), Some(delta_min), Some(baseline)) = (delta, delta_min, coverage.baseline) {
        if delta < delta_min {
            reasons.push(format!(
                "coverage changed by {} points against baseline {}%, minimum change is {}",
                pct(delta),
                pct(baseline),
                pct(delta_min)
            ));
        }
    }

    let facts = json!({
        "current": current,
        "min": min,
        "baseline": coverage.baseline,
        "delta": delta,
        "delta_min": delta_min,
    });

    let result = if reasons.is_empty() {
        ctx.pass(format!(
            "coverage {}% meets the minimum of {}%",
            pct(current),
            pct(min)
        ))
    } else {
        ctx.fail(reasons.join("; "))
    };
    result.with_evidence(facts)
}
