//! # Policy Document Model
//!
//! Typed view of a policy document. Base and override documents are merged
//! as JSON values (see [`crate::merge`]); this model is built from the
//! merged value and is what the rule evaluators read.
//!
//! Two collections are order-sensitive and use [`OrderedMap`]:
//!
//! - `rules`: declared order is evaluation order and decision order.
//! - `reviews.branches`: the first matching wildcard pattern wins.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pgate_core::{RuleSeverity, Severity, Threshold};

/// Map that keeps entries in document order. A repeated key keeps its first
/// position and its last value.
pub type OrderedMap<T> = IndexMap<String, T>;

/// Enforcement mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Unwaived blocking failures fail the run.
    #[default]
    Enforce,
    /// Failures are reported but the run is never marked failed.
    Advisory,
}

impl Mode {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enforce => "enforce",
            Self::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which baseline an override is merged onto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extends {
    /// The organization baseline.
    #[default]
    Org,
    /// An empty base. Needs out-of-band approval.
    None,
}

/// Declaration of one rule: its blocking weight and evidence requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDeclaration {
    /// Blocking weight.
    #[serde(default)]
    pub severity: RuleSeverity,
    /// Missing evidence fails the rule instead of warning.
    #[serde(default)]
    pub requires_evidence: bool,
}

/// `tests` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestsPolicy {
    /// Minimum line coverage percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_min: Option<f64>,
    /// Minimum allowed change against the baseline coverage, in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_delta_min: Option<f64>,
    /// Where the coverage report is expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_report_path: Option<String>,
}

/// One scanner's configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerPolicy {
    /// Tool name, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Highest tolerated finding severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<Severity>,
}

/// `security` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Static analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sast: Option<ScannerPolicy>,
    /// Dependency scanning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sca: Option<ScannerPolicy>,
    /// Organization threshold for SAST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sast_threshold: Option<Threshold>,
    /// Organization threshold for SCA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sca_threshold: Option<Threshold>,
    /// Organization threshold for DAST. Constrained on merge only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dast_threshold: Option<Threshold>,
}

/// Review requirements for a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRule {
    /// Minimum number of approvals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approvals: Option<u32>,
    /// At least one approval must come from a code owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_code_owner: Option<bool>,
    /// At least one approver must belong to one of these teams.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_teams: Vec<String>,
}

/// Approvals required by a resolved rule that sets no count.
pub const DEFAULT_REQUIRED_APPROVALS: u32 = 1;

impl ReviewRule {
    /// Approval count, with [`DEFAULT_REQUIRED_APPROVALS`] when unset.
    pub fn approvals_required(&self) -> u32 {
        self.required_approvals.unwrap_or(DEFAULT_REQUIRED_APPROVALS)
    }

    /// Code owner approval requirement, `false` when unset.
    pub fn code_owner_required(&self) -> bool {
        self.require_code_owner.unwrap_or(false)
    }
}

/// `reviews` section. The top-level fields form the flattened baseline rule
/// used when neither a branch pattern nor `default` applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewsPolicy {
    /// Rule for branches with no pattern match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ReviewRule>,
    /// Branch pattern → rule, in document order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub branches: OrderedMap<ReviewRule>,
    /// Flattened baseline: minimum approvals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approvals: Option<u32>,
    /// Flattened baseline: code owner approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_code_owner: Option<bool>,
    /// Flattened baseline: required teams.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_teams: Vec<String>,
}

impl ReviewsPolicy {
    /// The top-level fields as a rule.
    pub fn flattened(&self) -> ReviewRule {
        ReviewRule {
            required_approvals: self.required_approvals,
            require_code_owner: self.require_code_owner,
            required_teams: self.required_teams.clone(),
        }
    }
}

/// `adr` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdrPolicy {
    /// Path globs that make an ADR reference mandatory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_on_paths: Vec<String>,
    /// Referenced ADRs must have status `Accepted`.
    #[serde(default)]
    pub require_accepted_adr: bool,
    /// Glob for ADR documents; a changed file matching it counts as a
    /// reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adr_file_glob: Option<String>,
}

/// `artifacts` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsPolicy {
    /// An SBOM must be present.
    #[serde(default)]
    pub require_sbom: bool,
    /// A non-empty hash manifest must be present.
    #[serde(default)]
    pub require_hashes: bool,
    /// Artifact signatures must verify.
    #[serde(default)]
    pub require_signatures: bool,
    /// Branch patterns the gate applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_branches: Option<Vec<String>>,
    /// Target environments the gate applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_environments: Option<Vec<String>>,
}

/// Release branch patterns used when `artifacts.release_branches` is unset.
pub const DEFAULT_RELEASE_BRANCHES: &[&str] = &["release/*", "main"];

/// Production environments used when `artifacts.production_environments`
/// is unset.
pub const DEFAULT_PRODUCTION_ENVIRONMENTS: &[&str] = &["production", "prod"];

impl ArtifactsPolicy {
    /// Release branch patterns, falling back to [`DEFAULT_RELEASE_BRANCHES`].
    pub fn release_branch_patterns(&self) -> Vec<&str> {
        match &self.release_branches {
            Some(patterns) => patterns.iter().map(String::as_str).collect(),
            None => DEFAULT_RELEASE_BRANCHES.to_vec(),
        }
    }

    /// Production environments, falling back to
    /// [`DEFAULT_PRODUCTION_ENVIRONMENTS`].
    pub fn production_environment_names(&self) -> Vec<&str> {
        match &self.production_environments {
            Some(envs) => envs.iter().map(String::as_str).collect(),
            None => DEFAULT_PRODUCTION_ENVIRONMENTS.to_vec(),
        }
    }
}

/// `supply_chain` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChainPolicy {
    /// Organization requirement: release artifacts are signed.
    #[serde(default)]
    pub require_signed_artifacts: bool,
    /// Organization requirement: an SBOM is published.
    #[serde(default)]
    pub require_sbom: bool,
}

/// A time-bound exception for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waiver {
    /// Rule id the waiver covers.
    pub rule: String,
    /// Recorded for audit only; never used for matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Expiry: `YYYY-MM-DD` or RFC 3339.
    pub ttl: String,
    /// Who approved it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    /// Link or reference supporting the waiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// A complete policy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Free-form version label (string or number in the source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    /// Override only: which base to merge onto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<Extends>,
    /// Enforcement mode; absent means enforce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Rule declarations in evaluation order.
    #[serde(default)]
    pub rules: OrderedMap<RuleDeclaration>,
    /// Test and coverage settings.
    #[serde(default)]
    pub tests: TestsPolicy,
    /// Scanner settings.
    #[serde(default)]
    pub security: SecurityPolicy,
    /// Review settings.
    #[serde(default)]
    pub reviews: ReviewsPolicy,
    /// ADR settings.
    #[serde(default)]
    pub adr: AdrPolicy,
    /// Artifact integrity settings.
    #[serde(default)]
    pub artifacts: ArtifactsPolicy,
    /// Organization supply-chain requirements.
    #[serde(default)]
    pub supply_chain: SupplyChainPolicy,
    /// Waivers embedded in the policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waivers: Vec<Waiver>,
}

impl PolicyDocument {
    /// Build the typed view from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Effective mode (`enforce` when unset).
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_default()
    }

    /// Version label as text.
    pub fn version_label(&self) -> Option<String> {
        match &self.version {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}
