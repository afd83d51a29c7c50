//! Document loading.
//!
//! Policies and waiver lists are usually YAML, evidence and decisions JSON.
//! Both are read into a `serde_json::Value` so schema validation, merging
//! and canonical digests work on a single value model. With the
//! `preserve_order` feature of `serde_json`, mapping keys keep their source
//! order, which is what gives rule declarations a stable evaluation order.

use std::path::Path;

use serde_json::Value;

use crate::validate::SchemaValidationError;

/// Source format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON (`.json`).
    Json,
    /// YAML (`.yaml`, `.yml`, or anything else).
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension. Unknown extensions are read as
    /// YAML, which also accepts JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Read and parse a YAML or JSON document.
///
/// # Errors
///
/// Returns `SchemaValidationError::DocumentLoadError` if the file cannot be
/// read or does not parse.
pub fn load_document(path: &Path) -> Result<Value, SchemaValidationError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| SchemaValidationError::DocumentLoadError {
            path: path.display().to_string(),
            reason: format!("cannot read file: {e}"),
        })?;
    parse_document(&content, DocumentFormat::from_path(path), &path.display().to_string())
}

/// Parse document text. `origin` names the document in error messages.
pub fn parse_document(
    content: &str,
    format: DocumentFormat,
    origin: &str,
) -> Result<Value, SchemaValidationError> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| SchemaValidationError::DocumentLoadError {
                path: origin.to_string(),
                reason: format!("invalid JSON: {e}"),
            })
        }
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
                SchemaValidationError::DocumentLoadError {
                    path: origin.to_string(),
                    reason: format!("invalid YAML: {e}"),
                }
            })?;
            yaml_to_json_value(&yaml).map_err(|e| SchemaValidationError::DocumentLoadError {
                path: origin.to_string(),
                reason: format!("YAML-to-JSON conversion failed: {e}"),
            })
        }
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Tags are stripped. Mapping keys must be strings, numbers or booleans.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
