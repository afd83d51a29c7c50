//! `artifacts.integrity`: SBOM, hash manifest and signature checks.
//!
//! Enforced only when the branch matches a release pattern and the target
//! environment is a production environment; otherwise the rule is skipped.
//! Organization `supply_chain` requirements add to the `artifacts` ones.

use serde_json::json;

use pgate_policy::{branch_pattern_matches, PolicyDocument};

use crate::context::RuleContext;
use crate::result::RuleResult;

/// Requirements after folding in `supply_chain`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactRequirements {
    /// SBOM present.
    pub sbom: bool,
    /// Non-empty hash manifest.
    pub hashes: bool,
    /// Verified signature.
    pub signatures: bool,
}

impl ArtifactRequirements {
    /// Fold `supply_chain` into the `artifacts` flags.
    pub fn from_policy(policy: &PolicyDocument) -> Self {
        Self {
            sbom: policy.artifacts.require_sbom || policy.supply_chain.require_sbom,
            hashes: policy.artifacts.require_hashes,
            signatures: policy.artifacts.require_signatures
                || policy.supply_chain.require_signed_artifacts,
        }
    }

    /// At least one requirement is set.
    pub fn any(&self) -> bool {
        self.sbom || self.hashes || self.signatures
    }
}

/// Branch is a release branch and environment is production.
pub fn is_enforced(
    policy: &PolicyDocument,
    branch: Option<&str>,
    environment: Option<&str>,
) -> bool {
    let (Some(branch), Some(environment)) = (branch, environment) else {
        return false;
    };
    let release = policy
        .artifacts
        .release_branch_patterns()
        .iter()
        .any(|p| branch_pattern_matches(p, branch));
    let production = policy
        .artifacts
        .production_environment_names()
        .iter()
        .any(|e| e.eq_ignore_ascii_case(environment));
    release && production
}

/// Evaluate `artifacts.integrity`.
pub fn evaluate(ctx: &RuleContext<'_>) -> RuleResult {
    let branch = ctx.evidence.branch();
    let environment = ctx.evidence.environment();
    if !is_enforced(ctx.policy, branch, environment) {
        return ctx
            .skip(format!(
                "artifact checks apply to release branches deploying to production (branch {}, environment {})",
                branch.unwrap_or("unknown"),
                environment.unwrap_or("unknown")
            ))
            .with_evidence(json!({"branch": branch, "environment": environment}));
    }

    let required = ArtifactRequirements::from_policy(ctx.policy);
    if !required.any() {
        return ctx.pass("no artifact requirements configured");
    }
    let Some(artifacts) = ctx.evidence.artifacts.as_ref() else {
        return ctx.missing("artifact integrity report");
    };

    let mut reasons: Vec<&str> = Vec::new();
    if required.sbom && !artifacts.sbom_available() {
        reasons.push("SBOM missing");
    }
    if required.hashes && !artifacts.hashes_available() {
        reasons.push("hash manifest missing or empty");
    }
    if required.signatures && !artifacts.signature_ok() {
        reasons.push("signature not verified");
    }

    let facts = json!({
        "branch": branch,
        "environment": environment,
        "require_sbom": required.sbom,
        "require_hashes": required.hashes,
        "require_signatures": required.signatures,
        "sbom_path": artifacts.sbom_path,
        "hash_manifest_path": artifacts.hash_manifest_path,
        "hashed_artifacts": artifacts.hashes.as_ref().map_or(0, |h| h.len()),
        "signature_verified": artifacts.signature_verified,
    });

    let result = if reasons.is_empty() {
        ctx.pass("release artifacts carry the required integrity evidence")
    } else {
        ctx.fail(reasons.join("; "))
    };
    result.with_evidence(facts)
}
