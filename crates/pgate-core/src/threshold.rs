//! # Severity Thresholds
//!
//! Organization policies express scanner gates as thresholds rather than
//! maximum severities: `none` (no gate), `no-critical`, `no-high`. The scale
//! is ordered by strictness, so a tighten-only override must keep
//! `rank(effective) >= rank(base)`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PgateError;
use crate::severity::Severity;

/// Scanner gate threshold, ordered from most permissive to strictest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Threshold {
    /// No threshold: any finding severity is tolerated.
    #[default]
    None,
    /// Critical findings are not tolerated.
    NoCritical,
    /// High and critical findings are not tolerated.
    NoHigh,
}

impl Threshold {
    /// Numeric rank (0–2).
    pub fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::NoCritical => 1,
            Self::NoHigh => 2,
        }
    }

    /// Canonical label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NoCritical => "no-critical",
            Self::NoHigh => "no-high",
        }
    }

    /// Highest finding severity this threshold still permits.
    pub fn ceiling(&self) -> Severity {
        match self {
            Self::None => Severity::Critical,
            Self::NoCritical => Severity::High,
            Self::NoHigh => Severity::Medium,
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Threshold {
    type Err = PgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "no-critical" => Ok(Self::NoCritical),
            "no-high" => Ok(Self::NoHigh),
            other => Err(PgateError::UnknownLabel {
                scale: "threshold",
                value: other.to_string(),
                expected: "none, no-critical, no-high",
            }),
        }
    }
}
