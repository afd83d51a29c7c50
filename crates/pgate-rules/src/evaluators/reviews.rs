//! `reviews.branch`: approval requirements resolved per branch.
//!
//! Conditions are checked in order and the first unmet one is reported:
//! approval count, code owner approval, required team. A resolved rule
//! that sets no approval count requires one approval.

use serde_json::json;

use pgate_policy::resolve_review_rule;

use crate::context::RuleContext;
use crate::result::RuleResult;

/// Evaluate `reviews.branch`.
pub fn evaluate(ctx: &RuleContext<'_>) -> RuleResult {
    let Some(reviews) = ctx.evidence.reviews.as_ref() else {
        return ctx.missing("review approvals");
    };
    let branch = ctx.evidence.branch();
    let resolved = resolve_review_rule(&ctx.policy.reviews, branch);
    let rule = &resolved.rule;

    let required = rule.approvals_required();
    let require_code_owner = rule.code_owner_required();
    let approvals = reviews.approval_count();
    let team_approver = reviews.approver_in_teams(&rule.required_teams);

    let facts = json!({
        "branch": branch,
        "approvals": approvals,
        "required_approvals": required,
        "require_code_owner": require_code_owner,
        "code_owner_approved": reviews.code_owner_satisfied(),
        "required_teams": rule.required_teams,
        "team_approver": team_approver.map(|a| a.user.as_str()),
    });

    let result = if approvals < required as usize {
        ctx.fail(format!(
            "{approvals} approval(s), {required} required on {}",
            branch.unwrap_or("this branch")
        ))
    } else if require_code_owner && !reviews.code_owner_satisfied() {
        ctx.fail("code owner approval required")
    } else if !rule.required_teams.is_empty() && team_approver.is_none() {
        ctx.fail(format!(
            "no approver from required team(s): {}",
            rule.required_teams.join(", ")
        ))
    } else {
        ctx.pass(format!("{approvals} approval(s), review requirements met"))
    };
    result
        .with_evidence(facts)
        .with_source(resolved.source.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::fixture::*;
    use pgate_core::RuleOutcome;

    fn policy_json() -> serde_json::Value {
        json!({
            "reviews": {
                "default": {"required_approvals": 1},
                "branches": {
                    "release/*": {
                        "required_approvals": 2,
                        "require_code_owner": true,
                        "required_teams": ["release-managers"]
                    }
                }
            }
        })
    }

    fn run(evidence_json: serde_json::Value) -> RuleResult {
        let p = policy(policy_json());
        let e = evidence(evidence_json);
        evaluate(&RuleContext::new("reviews.branch", block(), &p, &e))
    }

    #[test]
    fn test_release_branch_uses_pattern_rule() {
        let r = run(json!({
            "reviews": {
                "branch": "release/2.0",
                "approvals": [
                    {"user": "ana", "teams": ["release-managers"], "code_owner": true},
                    {"user": "bo"}
                ]
            }
        }));
        assert_eq!(r.result, RuleOutcome::Pass);
        assert_eq!(r.source.as_deref(), Some("release/*"));
        assert_eq!(r.evidence["team_approver"], "ana");
    }

    #[test]
    fn test_approval_count_checked_first() {
        let r = run(json!({
            "reviews": {"branch": "release/2.0", "approvals": [{"user": "ana"}]}
        }));
        assert_eq!(r.result, RuleOutcome::Fail);
        assert!(r.message.contains("1 approval(s), 2 required"));
    }

    #[test]
    fn test_duplicate_approvals_count_once() {
        let r = run(json!({
            "reviews": {
                "branch": "release/2.0",
                "approvals": [{"user": "ana", "code_owner": true}, {"user": "ana"}]
            }
        }));
        assert_eq!(r.result, RuleOutcome::Fail);
        assert_eq!(r.evidence["approvals"], 1);
    }

    #[test]
    fn test_code_owner_checked_before_team() {
        let r = run(json!({
            "reviews": {"branch": "release/2.0", "approvals": [{"user": "ana"}, {"user": "bo"}]}
        }));
        assert_eq!(r.result, RuleOutcome::Fail);
        assert_eq!(r.message, "code owner approval required");
    }

    #[test]
    fn test_team_requirement() {
        let r = run(json!({
            "reviews": {
                "branch": "release/2.0",
                "code_owner_approved": true,
                "approvals": [{"user": "ana", "teams": ["web"]}, {"user": "bo"}]
            }
        }));
        assert_eq!(r.result, RuleOutcome::Fail);
        assert!(r.message.contains("release-managers"));
    }

    #[test]
    fn test_feature_branch_uses_default() {
        let r = run(json!({
            "reviews": {"branch": "feature/login", "approvals": [{"user": "ana"}]}
        }));
        assert_eq!(r.result, RuleOutcome::Pass);
        assert_eq!(r.source.as_deref(), Some("default"));
    }

    #[test]
    fn test_branch_from_context() {
        let r = run(json!({
            "context": {"branch": "release/3.1"},
            "reviews": {"approvals": [{"user": "ana"}]}
        }));
        assert_eq!(r.source.as_deref(), Some("release/*"));
        assert_eq!(r.result, RuleOutcome::Fail);
    }

    #[test]
    fn test_no_configuration_requires_one_approval() {
        let p = policy(json!({}));
        let e = evidence(json!({"reviews": {"approvals": []}}));
        let r = evaluate(&RuleContext::new("reviews", block(), &p, &e));
        assert_eq!(r.result, RuleOutcome::Fail);
        assert_eq!(r.source.as_deref(), Some("baseline"));
    }

    #[test]
    fn test_missing_reviews() {
        let r = run(json!({}));
        assert!(r.missing_evidence);
        assert_eq!(r.result, RuleOutcome::Warn);
    }
}
