#![deny(missing_docs)]

//! # pgate-schema: Structural Validation
//!
//! Every document that enters pgate (base policy, override policy, evidence
//! bundle, waiver list) and the decision record it emits has a JSON Schema
//! (Draft 2020-12). The schemas under `schemas/` are compiled into the crate;
//! a schema directory supplied at runtime overrides them by filename.
//!
//! - [`SchemaValidator::builtin`] / [`SchemaValidator::with_overrides`]:
//!   construct a validator.
//! - [`SchemaValidator::validate_kind`]: validate a parsed document and
//!   collect every violation, one per offending field.
//! - [`load_document`]: read a YAML or JSON file into a `serde_json::Value`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pgate-*` crates.
//! - Schema `$id` URIs are resolved locally; validation never touches the
//!   network.

pub mod document;
pub mod validate;

pub use document::{load_document, parse_document, yaml_to_json_value, DocumentFormat};
pub use validate::{
    SchemaKind, SchemaValidationError, SchemaValidator, ValidationViolations, Violation,
};
