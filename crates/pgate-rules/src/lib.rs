#![deny(missing_docs)]

//! # pgate-rules: Rule Evaluation and Decision Aggregation
//!
//! Takes an [`EffectivePolicy`](pgate_policy::EffectivePolicy), an
//! [`EvidenceBundle`](pgate_evidence::EvidenceBundle) and a waiver list and
//! produces exactly one [`Decision`].
//!
//! ```text
//! rules (declared order) ─ RuleKind::from_id ─ evaluator ─ waiver::apply ─┐
//!                                                                         ├─ status, score ─ Decision
//! waivers ─ is_active ─ active_waivers_for_rule ──────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Every declared rule is evaluated and reported, whatever the other
//!   rules return. Rule failures are values, never errors.
//! - Unknown rule ids degrade to a non-blocking `warn`.
//! - Evaluation is pure: the clock is an input, so identical inputs give a
//!   byte-identical decision.

pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod evaluators;
pub mod result;
pub mod waiver;

pub use pgate_policy::{
    branch_pattern_matches, resolve_review_rule, ResolvedReviewRule, ReviewRuleSource,
};
pub use context::RuleContext;
pub use decision::{compute_score, compute_status, Decision, DecisionMeta, DecisionStatus};
pub use engine::{evaluate, DecisionEngine, ENGINE_VERSION};
pub use error::{RuleError, RulesResult};
pub use result::RuleResult;
pub use waiver::{
    active_waivers_for_rule, apply, audit_waivers, is_active, WaiverAudit, WaiverStatus,
    EXPIRING_SOON_DAYS,
};
