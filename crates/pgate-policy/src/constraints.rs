//! # Non-Relaxable Constraints
//!
//! An override may tighten the organization baseline but never loosen it.
//! [`check_constraints`] compares the base document with the merged
//! (effective) document and returns every weakened field. It never stops at
//! the first violation.
//!
//! | Field | Rule |
//! |-------|------|
//! | `mode` | `enforce` stays `enforce` |
//! | `tests.coverage_min`, `tests.coverage_delta_min` | effective ≥ base |
//! | `security.{sast,sca,dast}_threshold` | rank(effective) ≥ rank(base) on `none < no-critical < no-high` |
//! | `security.{sast,sca}.max_severity` | rank(effective) ≤ rank(base) |
//! | `supply_chain.*`, `artifacts.require_*`, `adr.require_accepted_adr` | `true` stays `true` |
//! | resolved review rule, per branch | approvals ≥ base, code owner stays required, teams stay within base teams |
//! | `artifacts.release_branches`, `artifacts.production_environments` | every base entry stays covered |
//! | `rules.<id>.severity` | rank(effective) ≥ rank(base) on `info < warn < block` |
//!
//! A field absent from the base is unconstrained. A field present in the
//! base but missing or unparsable in the effective document is a violation.
//!
//! Review requirements are compared after branch resolution, not field by
//! field: an added `reviews.branches` entry takes over every branch it
//! matches, so each branch key from either document, one branch that no
//! pattern but `*` matches and the no-branch case are resolved against both
//! documents. A violation names the effective entry that resolved weaker.
//! The artifact scopes fall back to their defaults on both sides, so
//! narrowing an implicit scope is caught as well.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use pgate_core::{RuleSeverity, Severity, Threshold};

use crate::branch::{branch_pattern_matches, resolve_review_rule, ReviewRuleSource};
use crate::document::{ArtifactsPolicy, ReviewRule, ReviewsPolicy};

/// A branch name no `reviews.branches` key can equal: `~` is not allowed in
/// git ref names.
const UNLISTED_BRANCH: &str = "~unlisted";

/// A non-relaxable field that was weakened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Dotted field path.
    pub field: String,
    /// Rendered base value.
    pub base: String,
    /// Rendered effective value (`<absent>` if missing).
    pub effective: String,
}

impl ConstraintViolation {
    /// Build a violation from rendered values.
    pub fn new(
        field: impl Into<String>,
        base: impl Into<String>,
        effective: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            base: base.into(),
            effective: effective.into(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: base={} effective={}",
            self.field, self.base, self.effective
        )
    }
}

/// How a field may change between base and effective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tightening {
    /// `enforce` may not become anything else.
    Mode,
    /// Numeric value may only grow.
    NumberAtLeast,
    /// Threshold rank may only grow.
    ThresholdAtLeast,
    /// Maximum tolerated severity may only shrink.
    SeverityAtMost,
    /// `true` may not become `false`.
    StaysTrue,
    /// Rule blocking weight may only grow.
    RuleSeverityAtLeast,
}

/// Fixed-path constraints, checked in this order.
const CONSTRAINTS: &[(&[&str], Tightening)] = &[
    (&["mode"], Tightening::Mode),
    (&["tests", "coverage_min"], Tightening::NumberAtLeast),
    (&["tests", "coverage_delta_min"], Tightening::NumberAtLeast),
    (&["security", "sast_threshold"], Tightening::ThresholdAtLeast),
    (&["security", "sca_threshold"], Tightening::ThresholdAtLeast),
    (&["security", "dast_threshold"], Tightening::ThresholdAtLeast),
    (&["security", "sast", "max_severity"], Tightening::SeverityAtMost),
    (&["security", "sca", "max_severity"], Tightening::SeverityAtMost),
    (&["supply_chain", "require_signed_artifacts"], Tightening::StaysTrue),
    (&["supply_chain", "require_sbom"], Tightening::StaysTrue),
    (&["artifacts", "require_sbom"], Tightening::StaysTrue),
    (&["artifacts", "require_hashes"], Tightening::StaysTrue),
    (&["artifacts", "require_signatures"], Tightening::StaysTrue),
    (&["adr", "require_accepted_adr"], Tightening::StaysTrue),
];

/// Compare `effective` against `base` and list every relaxed field.
pub fn check_constraints(base: &Value, effective: &Value) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();

    for (path, tightening) in CONSTRAINTS {
        let field = path.join(".");
        if let Some(v) = check_field(&field, *tightening, lookup(base, path), lookup(effective, path))
        {
            violations.push(v);
        }
    }

    check_reviews(base, effective, &mut violations);
    check_artifact_scopes(base, effective, &mut violations);

    // Rule ids contain dots, so they are walked separately.
    if let Some(base_rules) = base.get("rules").and_then(Value::as_object) {
        for (id, decl) in base_rules {
            let path = ["rules", id.as_str(), "severity"];
            let field = format!("rules.{id}.severity");
            if let Some(v) = check_field(
                &field,
                Tightening::RuleSeverityAtLeast,
                decl.get("severity"),
                lookup(effective, &path),
            ) {
                violations.push(v);
            }
        }
    }

    violations
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn section<T: DeserializeOwned>(doc: &Value, key: &str) -> Option<T> {
    serde_json::from_value(lookup(doc, &[key])?.clone()).ok()
}

fn render_list<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<&str> = items.iter().map(|item| item.as_ref()).collect();
    format!("[{}]", items.join(", "))
}

fn check_reviews(base: &Value, effective: &Value, violations: &mut Vec<ConstraintViolation>) {
    let Some(base_reviews) = section::<ReviewsPolicy>(base, "reviews") else {
        return;
    };
    let effective_reviews: ReviewsPolicy = section(effective, "reviews").unwrap_or_default();

    let mut branches: Vec<Option<&str>> = vec![None, Some(UNLISTED_BRANCH)];
    for key in base_reviews.branches.keys().chain(effective_reviews.branches.keys()) {
        if !branches.contains(&Some(key.as_str())) {
            branches.push(Some(key.as_str()));
        }
    }

    for branch in branches {
        let was = resolve_review_rule(&base_reviews, branch);
        let now = resolve_review_rule(&effective_reviews, branch);
        let entry = match &now.source {
            ReviewRuleSource::Exact(key) | ReviewRuleSource::Pattern(key) => {
                format!("reviews.branches.{key}")
            }
            ReviewRuleSource::Default => "reviews.default".to_string(),
            ReviewRuleSource::Baseline => "reviews".to_string(),
        };
        for v in relaxed_review_fields(&entry, &was.rule, &now.rule) {
            if !violations.iter().any(|seen| seen.field == v.field) {
                violations.push(v);
            }
        }
    }
}

fn relaxed_review_fields(
    entry: &str,
    base: &ReviewRule,
    effective: &ReviewRule,
) -> Vec<ConstraintViolation> {
    let mut out = Vec::new();
    if effective.approvals_required() < base.approvals_required() {
        out.push(ConstraintViolation::new(
            format!("{entry}.required_approvals"),
            base.approvals_required().to_string(),
            effective.approvals_required().to_string(),
        ));
    }
    if base.code_owner_required() && !effective.code_owner_required() {
        out.push(ConstraintViolation::new(
            format!("{entry}.require_code_owner"),
            "true",
            "false",
        ));
    }
    let teams_widened = effective.required_teams.is_empty()
        || effective
            .required_teams
            .iter()
            .any(|team| !base.required_teams.contains(team));
    if !base.required_teams.is_empty() && teams_widened {
        out.push(ConstraintViolation::new(
            format!("{entry}.required_teams"),
            render_list(&base.required_teams),
            render_list(&effective.required_teams),
        ));
    }
    out
}

fn check_artifact_scopes(
    base: &Value,
    effective: &Value,
    violations: &mut Vec<ConstraintViolation>,
) {
    let base_artifacts: ArtifactsPolicy = section(base, "artifacts").unwrap_or_default();
    let effective_artifacts: ArtifactsPolicy = section(effective, "artifacts").unwrap_or_default();

    let was = base_artifacts.release_branch_patterns();
    let now = effective_artifacts.release_branch_patterns();
    let covered = |pattern: &&str| {
        now.iter()
            .any(|p| p == pattern || branch_pattern_matches(p, pattern))
    };
    if !was.iter().all(covered) {
        violations.push(ConstraintViolation::new(
            "artifacts.release_branches",
            render_list(&was),
            render_list(&now),
        ));
    }

    let was = base_artifacts.production_environment_names();
    let now = effective_artifacts.production_environment_names();
    if !was
        .iter()
        .all(|env| now.iter().any(|e| e.eq_ignore_ascii_case(env)))
    {
        violations.push(ConstraintViolation::new(
            "artifacts.production_environments",
            render_list(&was),
            render_list(&now),
        ));
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        None => "<absent>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn parse_label<T: FromStr>(value: Option<&Value>) -> Option<T> {
    value.and_then(Value::as_str).and_then(|s| s.parse().ok())
}

fn check_field(
    field: &str,
    tightening: Tightening,
    base: Option<&Value>,
    effective: Option<&Value>,
) -> Option<ConstraintViolation> {
    let base_value = base?;
    let relaxed = match tightening {
        Tightening::Mode => {
            base_value.as_str() == Some("enforce")
                && effective.and_then(Value::as_str) != Some("enforce")
        }
        Tightening::NumberAtLeast => {
            let b = base_value.as_f64()?;
            !matches!(effective.and_then(Value::as_f64), Some(e) if e >= b)
        }
        Tightening::ThresholdAtLeast => {
            let b: Threshold = parse_label(base)?;
            !matches!(parse_label::<Threshold>(effective), Some(e) if e.rank() >= b.rank())
        }
        Tightening::SeverityAtMost => {
            let b: Severity = parse_label(base)?;
            !matches!(parse_label::<Severity>(effective), Some(e) if e.rank() <= b.rank())
        }
        Tightening::StaysTrue => {
            base_value.as_bool() == Some(true)
                && effective.and_then(Value::as_bool) != Some(true)
        }
        Tightening::RuleSeverityAtLeast => {
            let b: RuleSeverity = parse_label(base)?;
            !matches!(parse_label::<RuleSeverity>(effective), Some(e) if e >= b)
        }
    };

    if relaxed {
        Some(ConstraintViolation::new(
            field,
            render(base),
            render(effective),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: &[ConstraintViolation]) -> Vec<&str> {
        v.iter().map(|c| c.field.as_str()).collect()
    }

    #[test]
    fn test_identical_documents_have_no_violations() {
        let doc = json!({
            "mode": "enforce",
            "tests": {"coverage_min": 80},
            "security": {"sast_threshold": "no-high", "sast": {"max_severity": "medium"}},
            "supply_chain": {"require_sbom": true},
            "rules": {"tests.green": {"severity": "block"}}
        });
        assert!(check_constraints(&doc, &doc).is_empty());
    }

    #[test]
    fn test_coverage_lowered() {
        let v = check_constraints(
            &json!({"tests": {"coverage_min": 50}}),
            &json!({"tests": {"coverage_min": 40}}),
        );
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].to_string(), "tests.coverage_min: base=50 effective=40");
    }

    #[test]
    fn test_coverage_raised_is_fine() {
        let v = check_constraints(
            &json!({"tests": {"coverage_min": 50}}),
            &json!({"tests": {"coverage_min": 90}}),
        );
        assert!(v.is_empty());
    }

    #[test]
    fn test_integer_and_float_compare_numerically() {
        let v = check_constraints(
            &json!({"tests": {"coverage_min": 80}}),
            &json!({"tests": {"coverage_min": 80.0}}),
        );
        assert!(v.is_empty());
    }

    #[test]
    fn test_mode_relaxed() {
        let v = check_constraints(&json!({"mode": "enforce"}), &json!({"mode": "advisory"}));
        assert_eq!(fields(&v), ["mode"]);
        // advisory → enforce is a tightening.
        let v = check_constraints(&json!({"mode": "advisory"}), &json!({"mode": "enforce"}));
        assert!(v.is_empty());
    }

    #[test]
    fn test_threshold_rank() {
        let base = json!({"security": {"sast_threshold": "no-critical", "sca_threshold": "no-high", "dast_threshold": "none"}});
        let eff = json!({"security": {"sast_threshold": "none", "sca_threshold": "no-high", "dast_threshold": "no-critical"}});
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["security.sast_threshold"]);
        assert_eq!(v[0].base, "no-critical");
        assert_eq!(v[0].effective, "none");
    }

    #[test]
    fn test_max_severity_may_only_shrink() {
        let base = json!({"security": {"sast": {"max_severity": "medium"}, "sca": {"max_severity": "high"}}});
        let eff = json!({"security": {"sast": {"max_severity": "high"}, "sca": {"max_severity": "low"}}});
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["security.sast.max_severity"]);
    }

    #[test]
    fn test_boolean_hardening() {
        let base = json!({
            "supply_chain": {"require_signed_artifacts": true, "require_sbom": false},
            "artifacts": {"require_hashes": true}
        });
        let eff = json!({
            "supply_chain": {"require_signed_artifacts": false, "require_sbom": false},
            "artifacts": {"require_hashes": true}
        });
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["supply_chain.require_signed_artifacts"]);
    }

    #[test]
    fn test_rule_severity_downgrade() {
        let base = json!({"rules": {"security.sast": {"severity": "block"}, "tests.green": {"severity": "warn"}}});
        let eff = json!({"rules": {"security.sast": {"severity": "warn"}, "tests.green": {"severity": "block"}}});
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["rules.security.sast.severity"]);
    }

    #[test]
    fn test_absent_in_base_is_unconstrained() {
        let v = check_constraints(&json!({}), &json!({"mode": "advisory", "tests": {"coverage_min": 0}}));
        assert!(v.is_empty());
    }

    #[test]
    fn test_missing_in_effective_is_violation() {
        let base = json!({"mode": "enforce", "tests": {"coverage_min": 70}});
        let v = check_constraints(&base, &json!({}));
        assert_eq!(fields(&v), ["mode", "tests.coverage_min"]);
        assert_eq!(v[1].effective, "<absent>");
    }

    #[test]
    fn test_all_violations_enumerated() {
        let base = json!({
            "mode": "enforce",
            "tests": {"coverage_min": 80, "coverage_delta_min": 0},
            "reviews": {"default": {"required_approvals": 2}}
        });
        let eff = json!({
            "mode": "advisory",
            "tests": {"coverage_min": 60, "coverage_delta_min": -5},
            "reviews": {"default": {"required_approvals": 1}}
        });
        let v = check_constraints(&base, &eff);
        assert_eq!(
            fields(&v),
            [
                "mode",
                "tests.coverage_min",
                "tests.coverage_delta_min",
                "reviews.default.required_approvals"
            ]
        );
    }

    #[test]
    fn test_wildcard_branch_entry_cannot_undercut_default() {
        let base = json!({"reviews": {"default": {"required_approvals": 2}}});
        let eff = json!({"reviews": {
            "default": {"required_approvals": 2},
            "branches": {"*": {"required_approvals": 0}}
        }});
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["reviews.branches.*.required_approvals"]);
        assert_eq!(v[0].base, "2");
        assert_eq!(v[0].effective, "0");
    }

    #[test]
    fn test_exact_branch_entry_cannot_undercut_pattern() {
        let base = json!({"reviews": {"branches": {
            "release/*": {"required_approvals": 2, "require_code_owner": true}
        }}});
        let eff = json!({"reviews": {"branches": {
            "release/*": {"required_approvals": 2, "require_code_owner": true},
            "release/legacy": {"required_approvals": 1}
        }}});
        let v = check_constraints(&base, &eff);
        assert_eq!(
            fields(&v),
            [
                "reviews.branches.release/legacy.required_approvals",
                "reviews.branches.release/legacy.require_code_owner"
            ]
        );
    }

    #[test]
    fn test_added_default_cannot_undercut_flattened_rule() {
        let base = json!({"reviews": {"required_approvals": 2}});
        let eff = json!({"reviews": {"required_approvals": 2, "default": {}}});
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["reviews.default.required_approvals"]);
        assert_eq!(v[0].effective, "1");
    }

    #[test]
    fn test_flattened_review_fields_are_constrained() {
        let base = json!({"reviews": {"required_approvals": 2, "require_code_owner": true}});
        let eff = json!({"reviews": {"required_approvals": 1, "require_code_owner": false}});
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["reviews.required_approvals", "reviews.require_code_owner"]);
    }

    #[test]
    fn test_added_review_team_widens_the_requirement() {
        let base = json!({"reviews": {"required_teams": ["platform"]}});
        let eff = json!({"reviews": {"required_teams": ["platform", "interns"]}});
        let v = check_constraints(&base, &eff);
        assert_eq!(fields(&v), ["reviews.required_teams"]);
        assert_eq!(v[0].base, "[platform]");
        assert_eq!(v[0].effective, "[platform, interns]");
    }

    #[test]
    fn test_stricter_branch_entries_are_fine() {
        let base = json!({"reviews": {"default": {"required_approvals": 1}}});
        let eff = json!({"reviews": {
            "default": {"required_approvals": 1},
            "branches": {
                "release/*": {"required_approvals": 3, "require_code_owner": true},
                "main": {"required_approvals": 2}
            }
        }});
        assert!(check_constraints(&base, &eff).is_empty());
    }

    #[test]
    fn test_release_branches_narrowed_from_defaults() {
        let eff = json!({"artifacts": {"require_sbom": true, "release_branches": ["never-matches"]}});
        let v = check_constraints(&json!({"artifacts": {"require_sbom": true}}), &eff);
        assert_eq!(fields(&v), ["artifacts.release_branches"]);
        assert_eq!(v[0].base, "[release/*, main]");
        assert_eq!(v[0].effective, "[never-matches]");
    }

    #[test]
    fn test_release_branches_may_widen() {
        let base = json!({"artifacts": {"release_branches": ["release/*", "main"]}});
        let added = json!({"artifacts": {"release_branches": ["release/*", "main", "hotfix/*"]}});
        assert!(check_constraints(&base, &added).is_empty());
        let wildcard = json!({"artifacts": {"release_branches": ["*"]}});
        assert!(check_constraints(&base, &wildcard).is_empty());
        let broader = json!({"artifacts": {"release_branches": ["release/*"]}});
        let nested = json!({"artifacts": {"release_branches": ["release/2.x/*"]}});
        assert!(check_constraints(&nested, &broader).is_empty());
    }

    #[test]
    fn test_production_environments_narrowed() {
        let eff = json!({"artifacts": {"production_environments": ["PRODUCTION"]}});
        let v = check_constraints(&json!({}), &eff);
        assert_eq!(fields(&v), ["artifacts.production_environments"]);
        assert_eq!(v[0].effective, "[PRODUCTION]");

        let eff = json!({"artifacts": {"production_environments": ["Production", "PROD", "staging"]}});
        assert!(check_constraints(&json!({}), &eff).is_empty());
    }
}
