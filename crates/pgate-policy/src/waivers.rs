//! Waiver list loading.
//!
//! Waiver files are either a bare array of waivers or an object with a
//! `waivers` array. Both shapes are schema-checked before parsing.

use std::path::Path;

use serde_json::Value;

use pgate_schema::{load_document, SchemaKind, SchemaValidator, ValidationViolations};

use crate::document::Waiver;
use crate::error::{PolicyError, PolicyResult};

/// Parse an already-validated waiver document.
pub fn parse_waivers(value: &Value, origin: &str) -> PolicyResult<Vec<Waiver>> {
    let list = match value {
        Value::Object(map) => map.get("waivers").cloned().unwrap_or(Value::Array(Vec::new())),
        other => other.clone(),
    };
    serde_json::from_value(list).map_err(|e| PolicyError::Model {
        origin: origin.to_string(),
        reason: e.to_string(),
    })
}

/// Load, schema-check and parse a waiver file.
pub fn load_waivers(path: &Path, validator: &SchemaValidator) -> PolicyResult<Vec<Waiver>> {
    let origin = path.display().to_string();
    let value = load_document(path).map_err(|e| PolicyError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let violations = validator.violations(&value, SchemaKind::Waivers.file_name())?;
    if !violations.is_empty() {
        return Err(PolicyError::Schema {
            origin,
            violations: ValidationViolations::from(violations),
        });
    }
    let waivers = parse_waivers(&value, &origin)?;
    tracing::debug!(count = waivers.len(), file = %origin, "waivers loaded");
    Ok(waivers)
}
