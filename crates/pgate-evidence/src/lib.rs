#![deny(missing_docs)]

//! # pgate-evidence: Evidence Contracts
//!
//! The facts a run is judged on, as normalized by collectors outside pgate.
//! This crate defines their shape ([`EvidenceBundle`]) and the thin shaping
//! done at the boundary:
//!
//! - scanner labels folded onto the canonical severity scale
//!   ([`ScanEvidence::severity_counts`]);
//! - ADR ids extracted from change descriptions and resolved against a
//!   catalog ([`extract_adr_ids`], [`resolve_adrs`]);
//! - the coverage baseline taken from a prior decision record
//!   ([`coverage_baseline_from_decision`]).

pub mod adr;
pub mod baseline;
pub mod bundle;
pub mod error;

pub use adr::{extract_adr_ids, resolve_adrs};
pub use baseline::{coverage_baseline_from_decision, load_coverage_baseline};
pub use bundle::{
    AdrEvidence, AdrRecord, Approval, ArtifactsEvidence, Context, CoverageEvidence,
    EvidenceBundle, ReviewsEvidence, ScanEvidence, SecurityEvidence, TestsEvidence,
    EVIDENCE_FILES,
};
pub use error::{EvidenceError, EvidenceResult};
