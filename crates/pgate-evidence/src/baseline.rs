//! Coverage baseline from a prior decision record.
//!
//! The only state carried between runs: when a previous decision is
//! supplied, the coverage it recorded becomes this run's baseline.

use std::path::Path;

use serde_json::Value;

use pgate_core::RuleKind;
use pgate_schema::load_document;

use crate::error::{EvidenceError, EvidenceResult};

/// Coverage recorded by the coverage rule of a prior decision.
///
/// Reads `rules[*].evidence.current` of the first rule whose id resolves to
/// the coverage rule. Returns `None` if there is no such rule or number.
pub fn coverage_baseline_from_decision(decision: &Value) -> Option<f64> {
    decision
        .get("rules")?
        .as_array()?
        .iter()
        .find(|rule| {
            rule.get("id")
                .and_then(Value::as_str)
                .is_some_and(|id| RuleKind::from_id(id) == RuleKind::CoverageMin)
        })?
        .get("evidence")?
        .get("current")?
        .as_f64()
}

/// Load a prior decision record and extract its coverage.
pub fn load_coverage_baseline(path: &Path) -> EvidenceResult<Option<f64>> {
    let decision = load_document(path).map_err(|e| EvidenceError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let baseline = coverage_baseline_from_decision(&decision);
    if baseline.is_none() {
        tracing::warn!(file = %path.display(), "prior decision has no coverage figure");
    }
    Ok(baseline)
}
