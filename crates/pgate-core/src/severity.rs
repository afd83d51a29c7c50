//! # Severity Model: Ordered Finding Severities
//!
//! Every severity-based rule compares findings on one scale:
//!
//! | Rank | Label |
//! |------|-------|
//! | 0 | `none` |
//! | 1 | `low` |
//! | 2 | `medium` |
//! | 3 | `high` |
//! | 4 | `critical` |
//!
//! Upstream scanners use their own vocabulary. [`Severity::normalize()`]
//! folds the common aliases onto this scale (`info`/`note` → `low`,
//! `warning`/`moderate` → `medium`, `error` → `high`). Any other label maps
//! to `medium`.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PgateError;

/// Finding severity, ordered by rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No findings.
    #[default]
    None,
    /// Informational or low-impact findings.
    Low,
    /// Medium-impact findings.
    Medium,
    /// High-impact findings.
    High,
    /// Critical findings.
    Critical,
}

impl Severity {
    /// All severities from least to most severe.
    pub fn all() -> &'static [Severity] {
        &[
            Self::None,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::Critical,
        ]
    }

    /// Numeric rank on the ordered scale (0–4).
    pub fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Canonical lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Map an arbitrary upstream label onto the scale.
    ///
    /// Canonical names match case-insensitively. Unrecognized labels map to
    /// `Medium`.
    pub fn normalize(label: &str) -> Severity {
        match label.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "low" | "info" | "note" => Self::Low,
            "medium" | "warning" | "moderate" => Self::Medium,
            "high" | "error" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = PgateError;

    /// Strict parse of a canonical label. Policy documents use this; evidence
    /// adapters use [`Severity::normalize()`] instead.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(PgateError::UnknownLabel {
                scale: "severity",
                value: other.to_string(),
                expected: "none, low, medium, high, critical",
            }),
        }
    }
}

/// Finding counts per severity for one scanner run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Critical findings.
    #[serde(default)]
    pub critical: u64,
    /// High findings.
    #[serde(default)]
    pub high: u64,
    /// Medium findings.
    #[serde(default)]
    pub medium: u64,
    /// Low findings.
    #[serde(default)]
    pub low: u64,
}

impl SeverityCounts {
    /// Count for a given severity (`None` always reports 0).
    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::None => 0,
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    /// Add `n` findings at `severity`, saturating. `None` is ignored.
    pub fn add(&mut self, severity: Severity, n: u64) {
        match severity {
            Severity::None => {}
            Severity::Low => self.low = self.low.saturating_add(n),
            Severity::Medium => self.medium = self.medium.saturating_add(n),
            Severity::High => self.high = self.high.saturating_add(n),
            Severity::Critical => self.critical = self.critical.saturating_add(n),
        }
    }

    /// Build counts from raw upstream labels, normalizing each label.
    ///
    /// Labels that normalize to the same severity are summed.
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut counts = Self::default();
        for (label, n) in labels {
            counts.add(Severity::normalize(label), n);
        }
        counts
    }

    /// Total number of findings across all severities.
    pub fn total(&self) -> u64 {
        self.critical
            .saturating_add(self.high)
            .saturating_add(self.medium)
            .saturating_add(self.low)
    }

    /// Counts keyed by canonical label.
    pub fn to_map(&self) -> BTreeMap<&'static str, u64> {
        Severity::all()
            .iter()
            .filter(|s| **s != Severity::None)
            .map(|s| (s.as_str(), self.get(*s)))
            .collect()
    }
}

/// Scan from most to least severe and return the first severity with a
/// non-zero count, or `Severity::None`.
pub fn highest_severity(counts: &SeverityCounts) -> Severity {
    Severity::all()
        .iter()
        .rev()
        .copied()
        .find(|s| counts.get(*s) > 0)
        .unwrap_or(Severity::None)
}

/// `true` iff `actual` does not exceed `max_allowed`.
pub fn is_allowed(max_allowed: Severity, actual: Severity) -> bool {
    actual.rank() <= max_allowed.rank()
}
