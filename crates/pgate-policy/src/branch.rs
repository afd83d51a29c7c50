//! # Branch-Aware Review Rules
//!
//! Resolution order for the review rule of a branch:
//!
//! 1. a `reviews.branches` key equal to the branch name;
//! 2. the first wildcard key, in declared order, that matches;
//! 3. `reviews.default`;
//! 4. the top-level `reviews` fields (the flattened baseline).
//!
//! A wildcard key is `prefix/*` (matches `prefix` itself and anything under
//! `prefix/`) or a bare `*`.

use crate::document::{ReviewRule, ReviewsPolicy};

/// `true` if `pattern` selects `branch`.
pub fn branch_pattern_matches(pattern: &str, branch: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(prefix) => {
            branch == prefix
                || branch
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        None => pattern == branch,
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern == "*" || pattern.ends_with("/*")
}

/// Where a resolved review rule came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewRuleSource {
    /// A branch key equal to the branch name.
    Exact(String),
    /// A wildcard branch key.
    Pattern(String),
    /// `reviews.default`.
    Default,
    /// Top-level `reviews` fields.
    Baseline,
}

impl ReviewRuleSource {
    /// Label recorded in the rule result: the matching key, `default` or
    /// `baseline`.
    pub fn label(&self) -> &str {
        match self {
            Self::Exact(key) | Self::Pattern(key) => key,
            Self::Default => "default",
            Self::Baseline => "baseline",
        }
    }
}

/// A review rule and the entry it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReviewRule {
    /// The requirements that apply.
    pub rule: ReviewRule,
    /// Which entry they were taken from.
    pub source: ReviewRuleSource,
}

/// Pick the review rule for `branch`. Without a branch only the default
/// and the baseline can apply.
pub fn resolve_review_rule(reviews: &ReviewsPolicy, branch: Option<&str>) -> ResolvedReviewRule {
    if let Some(branch) = branch {
        if let Some(rule) = reviews.branches.get(branch) {
            if !is_wildcard(branch) {
                return ResolvedReviewRule {
                    rule: rule.clone(),
                    source: ReviewRuleSource::Exact(branch.to_string()),
                };
            }
        }
        let matched = reviews
            .branches
            .iter()
            .find(|(pattern, _)| is_wildcard(pattern) && branch_pattern_matches(pattern, branch));
        if let Some((pattern, rule)) = matched {
            return ResolvedReviewRule {
                rule: rule.clone(),
                source: ReviewRuleSource::Pattern(pattern.clone()),
            };
        }
    }
    match &reviews.default {
        Some(rule) => ResolvedReviewRule {
            rule: rule.clone(),
            source: ReviewRuleSource::Default,
        },
        None => ResolvedReviewRule {
            rule: reviews.flattened(),
            source: ReviewRuleSource::Baseline,
        },
    }
}
