#![deny(missing_docs)]

//! # pgate-core: Foundational Types for the Policy Gate
//!
//! Every other crate in the workspace depends on `pgate-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Ordered scales are enums, not strings.** `Severity`, `Threshold` and
//!    `RuleSeverity` derive `Ord` in rank order, so every comparison in the
//!    rule evaluators and the constraint checker is a plain `<=`.
//!
//! 2. **Single `RuleKind` enum.** Rule identifiers are resolved once through
//!    a lookup table into a closed enum. Dispatch is an exhaustive `match`;
//!    adding a rule forces every consumer to handle it at compile time.
//!
//! 3. **`CanonicalBytes` newtype.** Digests of effective policies and
//!    decision records flow through `CanonicalBytes::new()` (RFC 8785), so
//!    equal documents always hash equally regardless of key order.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision and
//!    renders as `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pgate-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod glob;
pub mod rule;
pub mod severity;
pub mod temporal;
pub mod threshold;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, PgateError};
pub use glob::{glob_match, glob_match_any};
pub use rule::{RuleKind, RuleOutcome, RuleSeverity, RULE_KIND_COUNT};
pub use severity::{highest_severity, is_allowed, Severity, SeverityCounts};
pub use temporal::Timestamp;
pub use threshold::Threshold;
