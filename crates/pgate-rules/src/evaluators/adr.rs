//! `adr.required_for_infra`: changes under `adr.required_on_paths` must
//! reference a schema-valid ADR, and an accepted one when
//! `adr.require_accepted_adr` is set.

use serde_json::json;

use pgate_core::glob_match_any;
use pgate_evidence::AdrRecord;

use crate::context::RuleContext;
use crate::result::RuleResult;

/// Evaluate `adr.required_for_infra`.
pub fn evaluate(ctx: &RuleContext<'_>) -> RuleResult {
    let policy = &ctx.policy.adr;
    if policy.required_on_paths.is_empty() {
        return ctx.pass("no paths require an ADR");
    }
    let Some(adr) = ctx.evidence.adr.as_ref() else {
        return ctx.missing("changed paths");
    };

    let triggering: Vec<&str> = adr
        .changed_paths
        .iter()
        .filter(|p| glob_match_any(&policy.required_on_paths, p))
        .map(String::as_str)
        .collect();
    if triggering.is_empty() {
        return ctx
            .pass("no changed path requires an ADR")
            .with_evidence(json!({"triggering_paths": triggering}));
    }

    let referenced = adr.referenced_adrs(policy.adr_file_glob.as_deref());
    let acceptable =
        |r: &AdrRecord| r.schema_valid && (!policy.require_accepted_adr || r.is_accepted());
    let valid: Vec<&str> = referenced
        .iter()
        .filter(|r| acceptable(r))
        .map(|r| r.id.as_str())
        .collect();

    let facts = json!({
        "triggering_paths": triggering,
        "referenced": referenced.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        "valid": valid,
        "require_accepted_adr": policy.require_accepted_adr,
    });

    let result = if referenced.is_empty() {
        ctx.fail(format!(
            "changes to {} require an ADR reference; none found",
            triggering.join(", ")
        ))
    } else if valid.is_empty() {
        let problems: Vec<String> = referenced
            .iter()
            .map(|r| describe_problem(r, policy.require_accepted_adr))
            .collect();
        ctx.fail(format!("no acceptable ADR referenced: {}", problems.join(", ")))
    } else {
        ctx.pass(format!("infrastructure change covered by {}", valid.join(", ")))
    };
    result.with_evidence(facts)
}

fn describe_problem(record: &AdrRecord, require_accepted: bool) -> String {
    if !record.schema_valid {
        format!("{} (not schema-valid)", record.id)
    } else if require_accepted && !record.is_accepted() {
        format!(
            "{} (status {})",
            record.id,
            record.status.as_deref().unwrap_or("unknown")
        )
    } else {
        record.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::fixture::*;
    use pgate_core::RuleOutcome;

    fn policy_json(require_accepted: bool) -> serde_json::Value {
        json!({
            "adr": {
                "required_on_paths": ["infra/**", "terraform/*.tf"],
                "require_accepted_adr": require_accepted,
                "adr_file_glob": "docs/adr/*.md"
            }
        })
    }

    fn run(require_accepted: bool, evidence_json: serde_json::Value) -> RuleResult {
        let p = policy(policy_json(require_accepted));
        let e = evidence(evidence_json);
        evaluate(&RuleContext::new("adr.required_for_infra", block(), &p, &e))
    }

    #[test]
    fn test_untouched_infra_passes() {
        let r = run(true, json!({"adr": {"changed_paths": ["src/main.rs"]}}));
        assert_eq!(r.result, RuleOutcome::Pass);
    }

    #[test]
    fn test_infra_change_without_reference_fails() {
        let r = run(true, json!({"adr": {"changed_paths": ["infra/network/vpc.tf"]}}));
        assert_eq!(r.result, RuleOutcome::Fail);
        assert!(r.message.contains("infra/network/vpc.tf"));
    }

    #[test]
    fn test_accepted_reference_from_description_passes() {
        let r = run(
            true,
            json!({"adr": {
                "changed_paths": ["infra/dns.tf"],
                "description": "Moves DNS per ADR-12",
                "catalog": [{"id": "ADR-0012", "status": "Accepted", "schema_valid": true}]
            }}),
        );
        assert_eq!(r.result, RuleOutcome::Pass);
        assert_eq!(r.evidence["valid"][0], "ADR-0012");
    }

    #[test]
    fn test_proposed_adr_fails_when_acceptance_required() {
        let evidence_json = json!({"adr": {
            "changed_paths": ["terraform/main.tf"],
            "referenced": [{"id": "ADR-0003", "status": "Proposed", "schema_valid": true}]
        }});
        let r = run(true, evidence_json.clone());
        assert_eq!(r.result, RuleOutcome::Fail);
        assert!(r.message.contains("status Proposed"));

        let r = run(false, evidence_json);
        assert_eq!(r.result, RuleOutcome::Pass);
    }

    #[test]
    fn test_unknown_id_counts_as_invalid_reference() {
        let r = run(
            false,
            json!({"adr": {"changed_paths": ["infra/x.tf"], "description": "see ADR-0099"}}),
        );
        assert_eq!(r.result, RuleOutcome::Fail);
        assert!(r.message.contains("ADR-0099 (not schema-valid)"));
    }

    #[test]
    fn test_adr_file_in_change_counts_as_reference() {
        let r = run(
            true,
            json!({"adr": {
                "changed_paths": ["infra/x.tf", "docs/adr/0007-queues.md"],
                "catalog": [{
                    "id": "ADR-0007", "status": "accepted", "schema_valid": true,
                    "path": "docs/adr/0007-queues.md"
                }]
            }}),
        );
        assert_eq!(r.result, RuleOutcome::Pass);
    }

    #[test]
    fn test_no_configured_paths_passes_without_evidence() {
        let p = policy(json!({}));
        let e = evidence(json!({}));
        let r = evaluate(&RuleContext::new("adr.required", strict(), &p, &e));
        assert_eq!(r.result, RuleOutcome::Pass);
        assert!(!r.missing_evidence);
    }

    #[test]
    fn test_missing_change_evidence() {
        let p = policy(policy_json(false));
        let e = evidence(json!({}));
        let r = evaluate(&RuleContext::new("adr.required", strict(), &p, &e));
        assert_eq!(r.result, RuleOutcome::Fail);
        assert!(r.missing_evidence);
    }
}
