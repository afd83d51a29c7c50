//! # Rule Taxonomy: Closed Set of Evaluable Rules
//!
//! Rule identifiers in policy documents are free-form strings. They are
//! resolved exactly once, through [`RULE_ID_TABLE`], into the closed
//! [`RuleKind`] enum. Evaluator dispatch is an exhaustive `match` on
//! `RuleKind`; identifiers missing from the table resolve to
//! `RuleKind::Unknown` and are reported as non-blocking warnings.
//!
//! | Identifier | Aliases | Kind |
//! |------------|---------|------|
//! | `tests.green` | | `TestsGreen` |
//! | `coverage.min` | | `CoverageMin` |
//! | `security.sast` | | `SecuritySast` |
//! | `security.sca` | | `SecuritySca` |
//! | `reviews.branch` | `reviews` | `ReviewsBranch` |
//! | `adr.required_for_infra` | `adr.required` | `AdrRequired` |
//! | `artifacts.integrity` | `artifacts` | `ArtifactIntegrity` |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PgateError;

/// The evaluator a rule identifier dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Test suite status.
    TestsGreen,
    /// Coverage floor and coverage delta.
    CoverageMin,
    /// Static analysis finding severity.
    SecuritySast,
    /// Dependency scan finding severity.
    SecuritySca,
    /// Branch-aware review requirements.
    ReviewsBranch,
    /// ADR reference for infrastructure changes.
    AdrRequired,
    /// SBOM, hash manifest and signature checks on release artifacts.
    ArtifactIntegrity,
    /// Identifier not in the lookup table.
    Unknown,
}

/// Number of `RuleKind` variants, `Unknown` included.
pub const RULE_KIND_COUNT: usize = 8;

/// Identifier → kind lookup table. Canonical identifiers come first.
pub const RULE_ID_TABLE: &[(&str, RuleKind)] = &[
    ("tests.green", RuleKind::TestsGreen),
    ("coverage.min", RuleKind::CoverageMin),
    ("security.sast", RuleKind::SecuritySast),
    ("security.sca", RuleKind::SecuritySca),
    ("reviews.branch", RuleKind::ReviewsBranch),
    ("adr.required_for_infra", RuleKind::AdrRequired),
    ("artifacts.integrity", RuleKind::ArtifactIntegrity),
    ("reviews", RuleKind::ReviewsBranch),
    ("adr.required", RuleKind::AdrRequired),
    ("artifacts", RuleKind::ArtifactIntegrity),
];

impl RuleKind {
    /// Resolve a rule identifier through the lookup table.
    pub fn from_id(id: &str) -> RuleKind {
        RULE_ID_TABLE
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, kind)| *kind)
            .unwrap_or(RuleKind::Unknown)
    }

    /// All kinds, in table order, with `Unknown` last.
    pub fn all() -> &'static [RuleKind] {
        &[
            Self::TestsGreen,
            Self::CoverageMin,
            Self::SecuritySast,
            Self::SecuritySca,
            Self::ReviewsBranch,
            Self::AdrRequired,
            Self::ArtifactIntegrity,
            Self::Unknown,
        ]
    }

    /// Canonical rule identifier (`"unknown"` for `Unknown`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TestsGreen => "tests.green",
            Self::CoverageMin => "coverage.min",
            Self::SecuritySast => "security.sast",
            Self::SecuritySca => "security.sca",
            Self::ReviewsBranch => "reviews.branch",
            Self::AdrRequired => "adr.required_for_infra",
            Self::ArtifactIntegrity => "artifacts.integrity",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blocking weight of a rule, distinct from finding severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    /// Reported but ignored by status and score.
    Info,
    /// Contributes to score; never fails the run.
    #[default]
    Warn,
    /// An unwaived failure fails the run.
    Block,
}

impl RuleSeverity {
    /// Canonical label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }
}

impl std::fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleSeverity {
    type Err = PgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "block" => Ok(Self::Block),
            other => Err(PgateError::UnknownLabel {
                scale: "rule severity",
                value: other.to_string(),
                expected: "info, warn, block",
            }),
        }
    }
}

/// Result label of one rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    /// Condition met.
    Pass,
    /// Degraded: evidence missing but not required, or unknown rule.
    Warn,
    /// Condition violated.
    Fail,
    /// Condition violated but covered by an active waiver.
    FailWaived,
    /// Rule not applicable in this context.
    Skip,
}

impl RuleOutcome {
    /// Canonical label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::FailWaived => "fail_waived",
            Self::Skip => "skip",
        }
    }

    /// `Fail` or `FailWaived`.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::FailWaived)
    }
}

impl std::fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_count_matches_all() {
        assert_eq!(RuleKind::all().len(), RULE_KIND_COUNT);
    }

    #[test]
    fn test_canonical_ids_resolve_to_themselves() {
        for kind in RuleKind::all() {
            if *kind == RuleKind::Unknown {
                continue;
            }
            assert_eq!(RuleKind::from_id(kind.as_str()), *kind);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(RuleKind::from_id("reviews"), RuleKind::ReviewsBranch);
        assert_eq!(RuleKind::from_id("adr.required"), RuleKind::AdrRequired);
        assert_eq!(RuleKind::from_id("artifacts"), RuleKind::ArtifactIntegrity);
    }

    #[test]
    fn test_unrecognized_ids_are_unknown() {
        assert_eq!(RuleKind::from_id("security.dast"), RuleKind::Unknown);
        assert_eq!(RuleKind::from_id("tests.gren"), RuleKind::Unknown);
        assert_eq!(RuleKind::from_id(""), RuleKind::Unknown);
        // No prefix inference.
        assert_eq!(RuleKind::from_id("security.sast.extra"), RuleKind::Unknown);
    }

    #[test]
    fn test_table_has_no_duplicate_keys() {
        let mut keys: Vec<&str> = RULE_ID_TABLE.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }

    #[test]
    fn test_rule_severity_ordering_and_parse() {
        assert!(RuleSeverity::Info < RuleSeverity::Warn);
        assert!(RuleSeverity::Warn < RuleSeverity::Block);
        assert_eq!("block".parse::<RuleSeverity>().unwrap(), RuleSeverity::Block);
        assert!("error".parse::<RuleSeverity>().is_err());
    }

    #[test]
    fn test_outcome_serde_labels() {
        assert_eq!(
            serde_json::to_string(&RuleOutcome::FailWaived).unwrap(),
            "\"fail_waived\""
        );
        assert_eq!(RuleOutcome::Skip.to_string(), "skip");
        assert!(RuleOutcome::FailWaived.is_failure());
        assert!(!RuleOutcome::Warn.is_failure());
    }
}
