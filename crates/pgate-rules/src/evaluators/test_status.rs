//! `tests.green`: the test suite passed.

use serde_json::json;

use crate::context::RuleContext;
use crate::result::RuleResult;

/// Evaluate `tests.green`.
pub fn evaluate(ctx: &RuleContext<'_>) -> RuleResult {
    let Some(tests) = ctx.evidence.tests.as_ref().filter(|t| t.has_outcome()) else {
        return ctx.missing("test results");
    };
    let facts = json!({
        "status": tests.status,
        "passed": tests.passed,
        "failed": tests.failed,
        "skipped": tests.skipped,
    });
    let green = tests
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("green"))
        || tests.failed == Some(0);
    let result = if green {
        ctx.pass("test suite is green")
    } else {
        match tests.failed {
            Some(n) => ctx.fail(format!("{n} test(s) failed")),
            None => ctx.fail(format!(
                "test suite status is {}",
                tests.status.as_deref().unwrap_or("unknown")
            )),
        }
    };
    result.with_evidence(facts)
}
