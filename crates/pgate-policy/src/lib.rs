#![deny(missing_docs)]

//! # pgate-policy: Policy Documents and the Merge Engine
//!
//! An organization baseline and a repository override are merged into one
//! [`EffectivePolicy`]. The override may tighten the baseline but never
//! relax a non-relaxable field; a relaxing override is refused with every
//! offending field listed.
//!
//! ```text
//! base.yaml ─┐
//!            ├─ schema check ─ extends ─ merge_values ─ check_constraints ─ EffectivePolicy
//! repo.yaml ─┘
//! ```
//!
//! Merge failures are typed values ([`MergeError`]), never process exits.

pub mod branch;
pub mod constraints;
pub mod document;
pub mod effective;
pub mod error;
pub mod merge;
pub mod waivers;

pub use branch::{
    branch_pattern_matches, resolve_review_rule, ResolvedReviewRule, ReviewRuleSource,
};
pub use constraints::{check_constraints, ConstraintViolation};
pub use document::{
    AdrPolicy, ArtifactsPolicy, Extends, Mode, OrderedMap, PolicyDocument, ReviewRule,
    ReviewsPolicy, RuleDeclaration, ScannerPolicy, SecurityPolicy, SupplyChainPolicy,
    TestsPolicy, Waiver, DEFAULT_PRODUCTION_ENVIRONMENTS, DEFAULT_RELEASE_BRANCHES,
    DEFAULT_REQUIRED_APPROVALS,
};
pub use effective::EffectivePolicy;
pub use error::{DocumentViolation, MergeError, PolicyError, PolicyResult};
pub use merge::{load_policy_value, merge, merge_files, merge_values, MergeFlag, MergeOutcome};
pub use waivers::{load_waivers, parse_waivers};
