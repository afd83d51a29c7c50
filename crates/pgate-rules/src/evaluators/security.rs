//! `security.sast` and `security.sca`: highest finding severity against the
//! tolerated maximum.
//!
//! The tolerated maximum is the stricter of the scanner's `max_severity`
//! (unset means `critical`) and the ceiling of the organization threshold
//! for that scanner.

use serde_json::json;

use pgate_core::{highest_severity, is_allowed, Severity};
use pgate_evidence::ScanEvidence;
use pgate_policy::{PolicyDocument, ScannerPolicy};

use crate::context::RuleContext;
use crate::result::RuleResult;

/// Which scanner a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scanner {
    /// Static analysis, `security.sast`.
    Sast,
    /// Dependency scanning, `security.sca`.
    Sca,
}

impl Scanner {
    /// Section key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sast => "sast",
            Self::Sca => "sca",
        }
    }

    fn evidence<'e>(&self, ctx: &RuleContext<'e>) -> Option<&'e ScanEvidence> {
        match self {
            Self::Sast => ctx.evidence.security.sast.as_ref(),
            Self::Sca => ctx.evidence.security.sca.as_ref(),
        }
    }

    fn policy<'p>(&self, policy: &'p PolicyDocument) -> Option<&'p ScannerPolicy> {
        match self {
            Self::Sast => policy.security.sast.as_ref(),
            Self::Sca => policy.security.sca.as_ref(),
        }
    }

    /// Highest tolerated finding severity under `policy`.
    pub fn max_allowed(&self, policy: &PolicyDocument) -> Severity {
        let declared = self
            .policy(policy)
            .and_then(|p| p.max_severity)
            .unwrap_or(Severity::Critical);
        let threshold = match self {
            Self::Sast => policy.security.sast_threshold,
            Self::Sca => policy.security.sca_threshold,
        };
        match threshold {
            Some(t) => declared.min(t.ceiling()),
            None => declared,
        }
    }
}

/// Evaluate `security.sast` or `security.sca`.
pub fn evaluate(ctx: &RuleContext<'_>, scanner: Scanner) -> RuleResult {
    let Some(scan) = scanner.evidence(ctx) else {
        return ctx.missing(&format!("{} scan results", scanner.as_str()));
    };
    let counts = scan.severity_counts();
    let highest = highest_severity(&counts);
    let max_allowed = scanner.max_allowed(ctx.policy);
    let tool = scan
        .tool
        .clone()
        .or_else(|| scanner.policy(ctx.policy).and_then(|p| p.tool.clone()));

    let facts = json!({
        "tool": tool,
        "counts": counts.to_map(),
        "highest": highest,
        "max_severity": max_allowed,
    });

    let result = if is_allowed(max_allowed, highest) {
        ctx.pass(format!(
            "highest {} finding severity {highest} is within {max_allowed}",
            scanner.as_str()
        ))
    } else {
        ctx.fail(format!(
            "highest {} finding severity {highest} exceeds allowed {max_allowed} ({} {highest} finding(s))",
            scanner.as_str(),
            counts.get(highest)
        ))
    };
    result.with_evidence(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::fixture::*;
    use pgate_core::RuleOutcome;

    fn run(
        scanner: Scanner,
        policy_json: serde_json::Value,
        evidence_json: serde_json::Value,
    ) -> RuleResult {
        let p = policy(policy_json);
        let e = evidence(evidence_json);
        let id = format!("security.{}", scanner.as_str());
        evaluate(&RuleContext::new(&id, block(), &p, &e), scanner)
    }

    #[test]
    fn test_high_finding_exceeds_medium() {
        let r = run(
            Scanner::Sca,
            json!({"security": {"sca": {"max_severity": "medium"}}}),
            json!({"security": {"sca": {"counts": {"critical": 0, "high": 1, "medium": 3}}}}),
        );
        assert_eq!(r.result, RuleOutcome::Fail);
        assert_eq!(r.evidence["highest"], "high");
        assert_eq!(r.evidence["max_severity"], "medium");
    }

    #[test]
    fn test_within_max_passes() {
        let r = run(
            Scanner::Sast,
            json!({"security": {"sast": {"max_severity": "medium"}}}),
            json!({"security": {"sast": {"counts": {"medium": 4, "low": 2}}}}),
        );
        assert_eq!(r.result, RuleOutcome::Pass);
    }

    #[test]
    fn test_no_findings_passes_strictest_policy() {
        let r = run(
            Scanner::Sast,
            json!({"security": {"sast": {"max_severity": "none"}}}),
            json!({"security": {"sast": {"tool": "semgrep", "counts": {}}}}),
        );
        assert_eq!(r.result, RuleOutcome::Pass);
        assert_eq!(r.evidence["tool"], "semgrep");
    }

    #[test]
    fn test_threshold_tightens_max() {
        let p = policy(json!({
            "security": {"sast": {"max_severity": "critical"}, "sast_threshold": "no-high"}
        }));
        assert_eq!(Scanner::Sast.max_allowed(&p), Severity::Medium);
        assert_eq!(Scanner::Sca.max_allowed(&p), Severity::Critical);

        let r = run(
            Scanner::Sast,
            json!({"security": {"sast": {"max_severity": "critical"}, "sast_threshold": "no-high"}}),
            json!({"security": {"sast": {"counts": {"high": 1}}}}),
        );
        assert_eq!(r.result, RuleOutcome::Fail);
    }

    #[test]
    fn test_raw_labels_are_normalized() {
        let r = run(
            Scanner::Sca,
            json!({"security": {"sca": {"max_severity": "medium"}}}),
            json!({"security": {"sca": {"findings": {"moderate": 2, "error": 1}}}}),
        );
        assert_eq!(r.result, RuleOutcome::Fail);
        assert_eq!(r.evidence["highest"], "high");
    }

    #[test]
    fn test_missing_scan_is_missing_evidence() {
        let r = run(Scanner::Sca, json!({}), json!({"security": {"sast": {"counts": {}}}}));
        assert_eq!(r.result, RuleOutcome::Warn);
        assert!(r.missing_evidence);
        assert!(r.message.contains("sca"));
    }
}
