//! # Canonical Serialization: JCS-Compatible Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes used in digest
//! computation (the effective-policy digest).
//!
//! ## Invariant
//!
//! The inner field is private. The only constructor applies the coercion
//! pipeline below before RFC 8785 (JCS) serialization, so two documents that
//! differ only in key order or in `80` vs `80.0` produce identical bytes.
//!
//! 1. **Integral floats become integers.** YAML and JSON sources disagree on
//!    whether `80` is an integer or a float; both canonicalize to `80`.
//! 2. **Object keys are sorted** and separators are compact (`serde_jcs`).
//! 3. `null`, `bool`, `string` pass through unchanged.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with pgate coercion.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Integral numbers are serialized as integers.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let coerced = coerce_json_value(value);
        let bytes = serialize_canonical(&coerced)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively coerce JSON values according to the rules in the module docs.
fn coerce_json_value(value: Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => value,
        Value::Number(ref n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.is_finite() && f.abs() < 9.007_199_254_740_992e15 {
                        return Value::Number(serde_json::Number::from(f as i64));
                    }
                }
            }
            value
        }
        Value::Object(map) => {
            let coerced: serde_json::Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, coerce_json_value(v)))
                .collect();
            Value::Object(coerced)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(coerce_json_value).collect()),
    }
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785).
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_str(v: &Value) -> String {
        let cb = CanonicalBytes::new(v).expect("should canonicalize");
        String::from_utf8(cb.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_sorted_keys() {
        let data = serde_json::json!({"mode": "enforce", "adr": {}, "tests": {"coverage_min": 80}});
        assert_eq!(
            canonical_str(&data),
            r#"{"adr":{},"mode":"enforce","tests":{"coverage_min":80}}"#
        );
    }

    #[test]
    fn test_integral_float_matches_integer() {
        let as_float = serde_json::json!({"coverage_min": 80.0});
        let as_int = serde_json::json!({"coverage_min": 80});
        assert_eq!(canonical_str(&as_float), canonical_str(&as_int));
    }

    #[test]
    fn test_fractional_float_preserved() {
        let data = serde_json::json!({"coverage_delta_min": -0.5});
        assert_eq!(canonical_str(&data), r#"{"coverage_delta_min":-0.5}"#);
    }

    #[test]
    fn test_nested_arrays_keep_order() {
        let data = serde_json::json!({"required_on_paths": ["infra/**", "deploy/*"]});
        assert_eq!(
            canonical_str(&data),
            r#"{"required_on_paths":["infra/**","deploy/*"]}"#
        );
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(canonical_str(&serde_json::json!({})), "{}");
        assert_eq!(canonical_str(&serde_json::json!([])), "[]");
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        assert!(!cb.is_empty());
        assert_eq!(cb.len(), cb.as_ref().len());
    }
}
