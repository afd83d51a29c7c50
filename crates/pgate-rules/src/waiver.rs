//! # Waiver Resolver
//!
//! A waiver is active iff its `ttl` parses and `now <= ttl`. A calendar
//! date ttl (`2026-03-31`) is read as `2026-03-31T00:00:00Z`.
//!
//! Matching is by exact rule id. `scope` is carried into the decision for
//! audit but never narrows a match.

use serde::Serialize;

use pgate_core::{RuleOutcome, Timestamp};
use pgate_policy::Waiver;

use crate::result::RuleResult;

/// Waivers expiring within this many days are flagged by the audit.
pub const EXPIRING_SOON_DAYS: i64 = 3;

/// `ttl` parses and has not passed.
pub fn is_active(waiver: &Waiver, now: &Timestamp) -> bool {
    match Timestamp::parse_expiry(&waiver.ttl) {
        Ok(ttl) => *now <= ttl,
        Err(_) => false,
    }
}

/// Active waivers whose `rule` equals `rule_id`, in list order.
pub fn active_waivers_for_rule<'a>(
    waivers: &'a [Waiver],
    rule_id: &str,
    now: &Timestamp,
) -> Vec<&'a Waiver> {
    waivers
        .iter()
        .filter(|w| w.rule == rule_id && is_active(w, now))
        .collect()
}

/// Turn a raw `fail` into `fail_waived` when at least one active waiver
/// matches. Other results are returned unchanged.
pub fn apply(mut result: RuleResult, active: &[&Waiver]) -> RuleResult {
    if result.result != RuleOutcome::Fail {
        return result;
    }
    let Some(first) = active.first() else {
        return result;
    };
    result.result = RuleOutcome::FailWaived;
    result.waived = true;
    result.message = match first.approver.as_deref() {
        Some(approver) => format!(
            "{} (waived until {}, approved by {approver})",
            result.message, first.ttl
        ),
        None => format!("{} (waived until {})", result.message, first.ttl),
    };
    result
}

/// Audit classification of one waiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WaiverStatus {
    /// Active for more than [`EXPIRING_SOON_DAYS`].
    Active {
        /// Whole days left.
        days_left: i64,
    },
    /// Active, but expires within [`EXPIRING_SOON_DAYS`].
    ExpiringSoon {
        /// Whole days left.
        days_left: i64,
    },
    /// `ttl` has passed.
    Expired {
        /// Whole days since expiry.
        days_ago: i64,
    },
    /// Unusable: empty rule id or unparsable ttl.
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl WaiverStatus {
    /// Short label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active { .. } => "active",
            Self::ExpiringSoon { .. } => "expiring_soon",
            Self::Expired { .. } => "expired",
            Self::Invalid { .. } => "invalid",
        }
    }
}

/// One line of a waiver audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaiverAudit {
    /// The audited waiver.
    pub waiver: Waiver,
    /// Its classification at the audit instant.
    #[serde(flatten)]
    pub status: WaiverStatus,
}

/// Classify every waiver at `now`, in list order.
pub fn audit_waivers(waivers: &[Waiver], now: &Timestamp) -> Vec<WaiverAudit> {
    waivers
        .iter()
        .map(|w| WaiverAudit {
            waiver: w.clone(),
            status: classify(w, now),
        })
        .collect()
}

fn classify(waiver: &Waiver, now: &Timestamp) -> WaiverStatus {
    if waiver.rule.trim().is_empty() {
        return WaiverStatus::Invalid {
            reason: "empty rule id".to_string(),
        };
    }
    let ttl = match Timestamp::parse_expiry(&waiver.ttl) {
        Ok(ttl) => ttl,
        Err(e) => {
            return WaiverStatus::Invalid {
                reason: e.to_string(),
            }
        }
    };
    if *now > ttl {
        return WaiverStatus::Expired {
            days_ago: ttl.days_until(now),
        };
    }
    let days_left = now.days_until(&ttl);
    if days_left <= EXPIRING_SOON_DAYS {
        WaiverStatus::ExpiringSoon { days_left }
    } else {
        WaiverStatus::Active { days_left }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgate_core::RuleSeverity;

    fn waiver(rule: &str, ttl: &str) -> Waiver {
        Waiver {
            rule: rule.to_string(),
            scope: Some("CVE-2025-0001".to_string()),
            reason: Some("vendor fix pending".to_string()),
            ttl: ttl.to_string(),
            approver: Some("security-lead".to_string()),
            evidence: None,
        }
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-03-10T12:00:00Z").unwrap()
    }

    #[test]
    fn test_past_ttl_is_never_active() {
        assert!(!is_active(&waiver("security.sca", "2020-01-01"), &now()));
        assert!(active_waivers_for_rule(&[waiver("security.sca", "2020-01-01")], "security.sca", &now())
            .is_empty());
    }

    #[test]
    fn test_future_ttl_is_active() {
        assert!(is_active(&waiver("security.sca", "2026-04-01"), &now()));
        assert!(is_active(&waiver("security.sca", "2026-03-10T12:00:00Z"), &now()));
    }

    #[test]
    fn test_calendar_date_expires_at_midnight() {
        // 2026-03-10 means 2026-03-10T00:00:00Z, already past at noon.
        assert!(!is_active(&waiver("security.sca", "2026-03-10"), &now()));
    }

    #[test]
    fn test_unparsable_ttl_is_inactive() {
        assert!(!is_active(&waiver("security.sca", "soon"), &now()));
    }

    #[test]
    fn test_matching_is_exact_and_ignores_scope() {
        let list = vec![
            waiver("security.sca", "2026-12-31"),
            waiver("security", "2026-12-31"),
            waiver("security.sast", "2026-12-31"),
        ];
        let active = active_waivers_for_rule(&list, "security.sca", &now());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].rule, "security.sca");
    }

    #[test]
    fn test_apply_marks_failure_waived() {
        let w = waiver("security.sca", "2026-12-31");
        let raw = RuleResult::new("security.sca", RuleSeverity::Block, RuleOutcome::Fail, "high > medium");
        let applied = apply(raw, &[&w]);
        assert_eq!(applied.result, RuleOutcome::FailWaived);
        assert!(applied.waived);
        assert!(applied.message.starts_with("high > medium"));
        assert!(applied.message.contains("security-lead"));
    }

    #[test]
    fn test_apply_without_waivers_keeps_fail() {
        let raw = RuleResult::new("security.sca", RuleSeverity::Block, RuleOutcome::Fail, "x");
        let applied = apply(raw.clone(), &[]);
        assert_eq!(applied, raw);
    }

    #[test]
    fn test_apply_leaves_non_failures_alone() {
        let w = waiver("tests.green", "2026-12-31");
        for outcome in [RuleOutcome::Pass, RuleOutcome::Warn, RuleOutcome::Skip] {
            let raw = RuleResult::new("tests.green", RuleSeverity::Block, outcome, "x");
            let applied = apply(raw, &[&w]);
            assert_eq!(applied.result, outcome);
            assert!(!applied.waived);
        }
    }

    #[test]
    fn test_audit_classification() {
        let list = vec![
            waiver("a", "2026-06-01"),
            waiver("b", "2026-03-12"),
            waiver("c", "2026-03-01"),
            waiver("d", "not-a-date"),
            waiver(" ", "2026-06-01"),
        ];
        let audit = audit_waivers(&list, &now());
        let labels: Vec<&str> = audit.iter().map(|a| a.status.label()).collect();
        assert_eq!(labels, ["active", "expiring_soon", "expired", "invalid", "invalid"]);
        assert_eq!(audit[1].status, WaiverStatus::ExpiringSoon { days_left: 1 });
        assert_eq!(audit[2].status, WaiverStatus::Expired { days_ago: 9 });
    }

    #[test]
    fn test_audit_serializes_flat() {
        let audit = audit_waivers(&[waiver("c", "2026-03-01")], &now());
        let v = serde_json::to_value(&audit[0]).unwrap();
        assert_eq!(v["status"], "expired");
        assert_eq!(v["days_ago"], 9);
        assert_eq!(v["waiver"]["rule"], "c");
    }
}
