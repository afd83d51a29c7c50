//! # Evidence Bundle
//!
//! Normalized facts per governance domain, produced by collectors outside
//! pgate (test runners, coverage tools, scanners, the code host). The rule
//! evaluators read these facts; they never compute them.
//!
//! A bundle is loaded from a single YAML/JSON document or from a directory of
//! per-domain JSON files:
//!
//! | File | Section |
//! |------|---------|
//! | `context.json` | `context` |
//! | `tests.json` | `tests` |
//! | `coverage.json` | `coverage` |
//! | `security.json` | `security` |
//! | `reviews.json` | `reviews` |
//! | `adr.json` | `adr` |
//! | `artifacts.json` | `artifacts` |
//!
//! Every section is optional. An absent section is what the evaluators
//! report as missing evidence.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pgate_core::SeverityCounts;
use pgate_schema::{load_document, SchemaKind, SchemaValidator, ValidationViolations};

use crate::error::{EvidenceError, EvidenceResult};

/// Per-domain files read by [`EvidenceBundle::load_dir`], in bundle order.
pub const EVIDENCE_FILES: &[(&str, &str)] = &[
    ("context", "context.json"),
    ("tests", "tests.json"),
    ("coverage", "coverage.json"),
    ("security", "security.json"),
    ("reviews", "reviews.json"),
    ("adr", "adr.json"),
    ("artifacts", "artifacts.json"),
];

/// Where the change is going.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Source or target branch of the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Deployment target environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Test run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestsEvidence {
    /// Overall status reported by the runner (`green`, `red`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Passed test count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<u64>,
    /// Failed test count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    /// Skipped test count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<u64>,
}

impl TestsEvidence {
    /// `true` if the summary says anything about the outcome.
    pub fn has_outcome(&self) -> bool {
        self.status.is_some() || self.failed.is_some()
    }
}

/// Coverage percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageEvidence {
    /// Coverage of this change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Coverage of the comparison baseline, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    /// Report the numbers came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
}

/// One scanner's findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvidence {
    /// Scanner name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Counts already on the canonical scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<SeverityCounts>,
    /// Raw counts keyed by the tool's own labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub findings: BTreeMap<String, u64>,
}

impl ScanEvidence {
    /// Canonical counts plus the raw labels folded onto the canonical scale.
    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = self.counts.unwrap_or_default();
        let raw = SeverityCounts::from_labels(self.findings.iter().map(|(k, v)| (k.as_str(), *v)));
        for severity in pgate_core::Severity::all() {
            counts.add(*severity, raw.get(*severity));
        }
        counts
    }
}

/// Scanner results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvidence {
    /// Static analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sast: Option<ScanEvidence>,
    /// Dependency scanning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sca: Option<ScanEvidence>,
}

/// One approving review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Reviewer login.
    pub user: String,
    /// Teams the reviewer belongs to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<String>,
    /// Reviewer owns at least one changed path.
    #[serde(default)]
    pub code_owner: bool,
}

/// Review state of the change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewsEvidence {
    /// Branch the reviews apply to; falls back to `context.branch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Code host verdict on code owner approval, if it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_owner_approved: Option<bool>,
    /// Approving reviews.
    #[serde(default)]
    pub approvals: Vec<Approval>,
}

impl ReviewsEvidence {
    /// Number of distinct approving users.
    pub fn approval_count(&self) -> usize {
        let mut users: Vec<&str> = self.approvals.iter().map(|a| a.user.as_str()).collect();
        users.sort_unstable();
        users.dedup();
        users.len()
    }

    /// The code host says so, or some approver is a code owner.
    pub fn code_owner_satisfied(&self) -> bool {
        self.code_owner_approved
            .unwrap_or_else(|| self.approvals.iter().any(|a| a.code_owner))
    }

    /// First approver belonging to one of `teams`.
    pub fn approver_in_teams<S: AsRef<str>>(&self, teams: &[S]) -> Option<&Approval> {
        self.approvals
            .iter()
            .find(|a| a.teams.iter().any(|t| teams.iter().any(|r| r.as_ref() == t)))
    }
}

/// Metadata of one architecture decision record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdrRecord {
    /// Identifier, e.g. `ADR-0042`.
    pub id: String,
    /// Lifecycle status (`Proposed`, `Accepted`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Passed the ADR schema linter. Unknown counts as not valid.
    #[serde(default)]
    pub schema_valid: bool,
    /// Repository path of the ADR document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AdrRecord {
    /// Status is `Accepted` (case-insensitive).
    pub fn is_accepted(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("accepted"))
    }
}

/// Change facts relevant to the ADR rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdrEvidence {
    /// Files touched by the change.
    #[serde(default)]
    pub changed_paths: Vec<String>,
    /// Change description (pull request body).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ADRs the collector already resolved as referenced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced: Vec<AdrRecord>,
    /// All known ADRs, used to resolve ids found in the description.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalog: Vec<AdrRecord>,
}

/// Release artifact integrity facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsEvidence {
    /// Whether an SBOM was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbom_present: Option<bool>,
    /// Path of the SBOM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbom_path: Option<String>,
    /// Path of the hash manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_manifest_path: Option<String>,
    /// Artifact path → digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<BTreeMap<String, String>>,
    /// Signature verification result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_verified: Option<bool>,
    /// Path of the signature bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_path: Option<String>,
}

impl ArtifactsEvidence {
    /// Explicit flag, else a non-empty SBOM path.
    pub fn sbom_available(&self) -> bool {
        self.sbom_present
            .unwrap_or_else(|| self.sbom_path.as_deref().is_some_and(|p| !p.is_empty()))
    }

    /// The hash manifest is present and lists at least one artifact.
    pub fn hashes_available(&self) -> bool {
        self.hashes.as_ref().is_some_and(|h| !h.is_empty())
    }

    /// Signature verification ran and succeeded.
    pub fn signature_ok(&self) -> bool {
        self.signature_verified == Some(true)
    }
}

/// All evidence for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Branch and environment.
    #[serde(default)]
    pub context: Context,
    /// Test results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestsEvidence>,
    /// Coverage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageEvidence>,
    /// Scanner results.
    #[serde(default)]
    pub security: SecurityEvidence,
    /// Reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<ReviewsEvidence>,
    /// ADR facts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adr: Option<AdrEvidence>,
    /// Artifact integrity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactsEvidence>,
}

impl EvidenceBundle {
    /// Schema-check and parse a bundle value. `origin` names it in errors.
    pub fn from_value(
        value: &Value,
        origin: &str,
        validator: &SchemaValidator,
    ) -> EvidenceResult<Self> {
        let violations = validator.violations(value, SchemaKind::Evidence.file_name())?;
        if !violations.is_empty() {
            return Err(EvidenceError::Schema {
                origin: origin.to_string(),
                violations: ValidationViolations::from(violations),
            });
        }
        serde_json::from_value(value.clone()).map_err(|e| EvidenceError::Model {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a single YAML or JSON bundle.
    pub fn load(path: &Path, validator: &SchemaValidator) -> EvidenceResult<Self> {
        let value = load_document(path).map_err(|e| EvidenceError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let bundle = Self::from_value(&value, &path.display().to_string(), validator)?;
        tracing::debug!(file = %path.display(), "evidence bundle loaded");
        Ok(bundle)
    }

    /// Assemble a bundle from the per-domain files in `dir`. Missing files
    /// leave their section absent.
    pub fn load_dir(dir: &Path, validator: &SchemaValidator) -> EvidenceResult<Self> {
        if !dir.is_dir() {
            return Err(EvidenceError::Load {
                path: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut sections = Map::new();
        for (section, file) in EVIDENCE_FILES {
            let path = dir.join(file);
            if !path.exists() {
                tracing::debug!(section, "evidence file absent");
                continue;
            }
            let value = load_document(&path).map_err(|e| EvidenceError::Load {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            sections.insert((*section).to_string(), value);
        }

        let bundle = Self::from_value(&Value::Object(sections), &dir.display().to_string(), validator)?;
        tracing::debug!(dir = %dir.display(), "evidence directory loaded");
        Ok(bundle)
    }

    /// Branch for review and artifact rules: `reviews.branch`, else
    /// `context.branch`.
    pub fn branch(&self) -> Option<&str> {
        self.reviews
            .as_ref()
            .and_then(|r| r.branch.as_deref())
            .or(self.context.branch.as_deref())
    }

    /// Target environment.
    pub fn environment(&self) -> Option<&str> {
        self.context.environment.as_deref()
    }

    /// Fill `coverage.baseline` from a prior run when the collector did not
    /// supply one.
    pub fn with_coverage_baseline(mut self, baseline: Option<f64>) -> Self {
        if let Some(b) = baseline {
            if let Some(cov) = self.coverage.as_mut() {
                if cov.baseline.is_none() {
                    cov.baseline = Some(b);
                }
            }
        }
        self
    }
}
