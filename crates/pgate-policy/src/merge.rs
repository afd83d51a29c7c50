//! # Policy Merge Engine
//!
//! `merge(base, override)` produces the effective policy:
//!
//! 1. Both documents are schema-validated independently. Any violation in
//!    either aborts with all violations from both; nothing is merged.
//! 2. The override's `extends` picks the merge base. `org` (or absent) uses
//!    the supplied baseline; `none` uses an empty document and the outcome
//!    is flagged [`MergeFlag::RequiresOutOfBandApproval`].
//! 3. Values are merged recursively (see [`merge_values`]).
//! 4. Non-relaxable constraints are checked against the real baseline,
//!    whatever `extends` said.
//!
//! The result depends only on the inputs: no clocks, no hashing order, no
//! randomness. Identical inputs give byte-identical effective JSON.

use std::path::Path;

use serde_json::{Map, Value};

use pgate_schema::{load_document, SchemaKind, SchemaValidator};

use crate::constraints::check_constraints;
use crate::effective::EffectivePolicy;
use crate::error::{DocumentViolation, MergeError, PolicyError, PolicyResult};

/// Conditions attached to a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFlag {
    /// The override used `extends: none`. Constraints still held against the
    /// baseline, but the override needs approval outside this engine.
    RequiresOutOfBandApproval,
}

impl MergeFlag {
    /// Label used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiresOutOfBandApproval => "requires_out_of_band_approval",
        }
    }
}

/// A successful merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The effective policy.
    pub effective: EffectivePolicy,
    /// Flags raised during the merge.
    pub flags: Vec<MergeFlag>,
}

impl MergeOutcome {
    /// `true` if the override opted out of the baseline.
    pub fn requires_out_of_band_approval(&self) -> bool {
        self.flags.contains(&MergeFlag::RequiresOutOfBandApproval)
    }
}

/// Recursively merge `overlay` onto `base`.
///
/// - objects merge key by key; base keys keep their position, new keys are
///   appended in overlay order;
/// - arrays are unioned without duplicates, base elements first;
/// - anything else: the overlay value wins.
pub fn merge_values(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => {
            let mut out = b.clone();
            for (key, ov) in o {
                let merged = match b.get(key) {
                    Some(bv) => merge_values(bv, ov),
                    None => ov.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (Value::Array(b), Value::Array(o)) => {
            let mut out: Vec<Value> = Vec::with_capacity(b.len() + o.len());
            for item in b.iter().chain(o.iter()) {
                if !out.contains(item) {
                    out.push(item.clone());
                }
            }
            Value::Array(out)
        }
        (_, o) => o.clone(),
    }
}

fn without_extends(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = map.clone();
            out.shift_remove("extends");
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Merge an override onto a baseline.
///
/// # Errors
///
/// - `MergeError::Schema` with every violation from both documents;
/// - `MergeError::Constraint` with every relaxed field;
/// - `MergeError::Effective` if the merged document does not fit the model.
pub fn merge(
    base: &Value,
    overlay: &Value,
    validator: &SchemaValidator,
) -> Result<MergeOutcome, MergeError> {
    let schema = SchemaKind::Policy.file_name();
    let mut schema_violations: Vec<DocumentViolation> = Vec::new();
    for (label, doc) in [("base", base), ("override", overlay)] {
        schema_violations.extend(validator.violations(doc, schema)?.into_iter().map(|violation| {
            DocumentViolation {
                document: label.to_string(),
                violation,
            }
        }));
    }
    if !schema_violations.is_empty() {
        tracing::info!(count = schema_violations.len(), "policy inputs failed schema validation");
        return Err(MergeError::Schema {
            violations: schema_violations,
        });
    }

    let mut flags = Vec::new();
    let baseline = without_extends(base);
    let extends_none = overlay.get("extends").and_then(Value::as_str) == Some("none");
    let start = if extends_none {
        tracing::warn!("override uses extends: none; merging onto an empty base");
        flags.push(MergeFlag::RequiresOutOfBandApproval);
        Value::Object(Map::new())
    } else {
        baseline.clone()
    };

    let merged = merge_values(&start, &without_extends(overlay));

    let violations = check_constraints(&baseline, &merged);
    if !violations.is_empty() {
        for v in &violations {
            tracing::debug!(field = %v.field, base = %v.base, effective = %v.effective, "constraint relaxed");
        }
        tracing::info!(count = violations.len(), "override relaxes non-relaxable fields");
        return Err(MergeError::Constraint { violations });
    }

    let effective =
        EffectivePolicy::from_value(merged).map_err(|e| MergeError::Effective(e.to_string()))?;
    tracing::info!(
        digest = %effective.digest(),
        rules = effective.rules().len(),
        mode = %effective.mode(),
        "policy merged"
    );
    Ok(MergeOutcome { effective, flags })
}

/// Load both documents from disk and merge them.
pub fn merge_files(
    base_path: &Path,
    override_path: &Path,
    validator: &SchemaValidator,
) -> PolicyResult<MergeOutcome> {
    let base = load_policy_value(base_path)?;
    let overlay = load_policy_value(override_path)?;
    Ok(merge(&base, &overlay, validator)?)
}

/// Read a policy document (YAML or JSON) without validating it.
pub fn load_policy_value(path: &Path) -> PolicyResult<Value> {
    load_document(path).map_err(|e| PolicyError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::builtin().unwrap()
    }

    #[test]
    fn test_scalar_override_wins() {
        let merged = merge_values(&json!({"mode": "advisory"}), &json!({"mode": "enforce"}));
        assert_eq!(merged, json!({"mode": "enforce"}));
    }

    #[test]
    fn test_objects_merge_key_by_key() {
        let merged = merge_values(
            &json!({"tests": {"coverage_min": 80, "coverage_report_path": "cov.xml"}}),
            &json!({"tests": {"coverage_min": 85, "coverage_delta_min": 0}}),
        );
        assert_eq!(
            merged,
            json!({"tests": {"coverage_min": 85, "coverage_report_path": "cov.xml", "coverage_delta_min": 0}})
        );
        let keys: Vec<&String> = merged["tests"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["coverage_min", "coverage_report_path", "coverage_delta_min"]);
    }

    #[test]
    fn test_arrays_union_in_insertion_order() {
        let merged = merge_values(
            &json!({"paths": ["infra/**", "deploy/*", "infra/**"]}),
            &json!({"paths": ["terraform/**", "deploy/*"]}),
        );
        assert_eq!(merged, json!({"paths": ["infra/**", "deploy/*", "terraform/**"]}));
    }

    #[test]
    fn test_rule_order_base_then_new() {
        let merged = merge_values(
            &json!({"rules": {"tests.green": {"severity": "block"}, "coverage.min": {"severity": "warn"}}}),
            &json!({"rules": {"security.sca": {"severity": "block"}, "coverage.min": {"severity": "block"}}}),
        );
        let ids: Vec<&String> = merged["rules"].as_object().unwrap().keys().collect();
        assert_eq!(ids, ["tests.green", "coverage.min", "security.sca"]);
        assert_eq!(merged["rules"]["coverage.min"]["severity"], "block");
    }

    #[test]
    fn test_merge_raises_coverage() {
        let outcome = merge(
            &json!({"tests": {"coverage_min": 50}}),
            &json!({"tests": {"coverage_min": 90}}),
            &validator(),
        )
        .unwrap();
        assert_eq!(outcome.effective.document().tests.coverage_min, Some(90.0));
        assert!(outcome.flags.is_empty());
    }

    #[test]
    fn test_merge_lowering_coverage_fails() {
        let err = merge(
            &json!({"tests": {"coverage_min": 50}}),
            &json!({"tests": {"coverage_min": 40}}),
            &validator(),
        )
        .unwrap_err();
        match &err {
            MergeError::Constraint { violations } => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].field.contains("coverage_min"));
            }
            other => panic!("expected Constraint, got {other}"),
        }
    }

    #[test]
    fn test_schema_violations_from_both_documents() {
        let err = merge(
            &json!({"mode": "sometimes"}),
            &json!({"tests": {"coverage_min": "high"}, "unknown_section": {}}),
            &validator(),
        )
        .unwrap_err();
        match &err {
            MergeError::Schema { violations } => {
                let docs: Vec<&str> = violations.iter().map(|v| v.document.as_str()).collect();
                assert!(docs.contains(&"base"));
                assert!(docs.contains(&"override"));
                assert!(violations.len() >= 3, "{violations:?}");
            }
            other => panic!("expected Schema, got {other}"),
        }
    }

    #[test]
    fn test_extends_none_flags_and_still_checks_baseline() {
        let base = json!({"mode": "enforce", "tests": {"coverage_min": 70}, "adr": {"adr_file_glob": "docs/adr/*.md"}});

        let outcome = merge(
            &base,
            &json!({"extends": "none", "mode": "enforce", "tests": {"coverage_min": 75}}),
            &validator(),
        )
        .unwrap();
        assert!(outcome.requires_out_of_band_approval());
        // Empty base: nothing inherited from the baseline.
        assert!(outcome.effective.as_value().get("adr").is_none());
        assert!(outcome.effective.as_value().get("extends").is_none());

        let err = merge(
            &base,
            &json!({"extends": "none", "tests": {"coverage_min": 75}}),
            &validator(),
        )
        .unwrap_err();
        let lines = err.lines();
        assert_eq!(lines, ["mode: base=enforce effective=<absent>"]);
    }

    #[test]
    fn test_extends_org_is_stripped() {
        let outcome = merge(
            &json!({"mode": "enforce"}),
            &json!({"extends": "org", "tests": {"coverage_min": 60}}),
            &validator(),
        )
        .unwrap();
        assert!(!outcome.requires_out_of_band_approval());
        assert_eq!(
            outcome.effective.as_value(),
            &json!({"mode": "enforce", "tests": {"coverage_min": 60}})
        );
    }

    #[test]
    fn test_merge_is_deterministic() {
        let base = json!({
            "rules": {"tests.green": {"severity": "block"}, "coverage.min": {"severity": "block"}},
            "adr": {"required_on_paths": ["infra/**"]},
            "tests": {"coverage_min": 80}
        });
        let overlay = json!({
            "rules": {"security.sast": {"severity": "warn"}},
            "adr": {"required_on_paths": ["k8s/**"]}
        });
        let a = merge(&base, &overlay, &validator()).unwrap();
        let b = merge(&base, &overlay, &validator()).unwrap();
        assert_eq!(
            a.effective.to_json_pretty().unwrap(),
            b.effective.to_json_pretty().unwrap()
        );
        assert_eq!(a.effective.digest(), b.effective.digest());
    }

    #[test]
    fn test_merge_files_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("org.yaml");
        let overlay = dir.path().join("repo.yaml");
        std::fs::write(&base, "mode: enforce\ntests:\n  coverage_min: 70\n").unwrap();
        std::fs::write(&overlay, "extends: org\ntests:\n  coverage_min: 72.5\n").unwrap();
        let outcome = merge_files(&base, &overlay, &validator()).unwrap();
        assert_eq!(outcome.effective.document().tests.coverage_min, Some(72.5));
    }

    #[test]
    fn test_merge_files_missing_input() {
        let err = merge_files(
            Path::new("/nonexistent/org.yaml"),
            Path::new("/nonexistent/repo.yaml"),
            &validator(),
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::Load { .. }));
    }
}
