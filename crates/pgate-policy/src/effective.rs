//! # Effective Policy
//!
//! The merged, constraint-checked policy actually enforced for one run.
//! Fields are private; an `EffectivePolicy` cannot be modified after it is
//! built. It keeps three views of the same document:
//!
//! - the merged JSON value, in insertion order, used for output;
//! - the typed [`PolicyDocument`], read by the rule evaluators;
//! - a SHA-256 digest over the canonical (JCS) bytes of the value.

use std::path::Path;

use serde_json::Value;

use pgate_core::{sha256_digest, CanonicalBytes, ContentDigest};
use pgate_schema::{load_document, SchemaKind, SchemaValidator, ValidationViolations};

use crate::document::{Mode, OrderedMap, PolicyDocument, RuleDeclaration, Waiver};
use crate::error::{PolicyError, PolicyResult};

/// A merged policy, immutable once built.
#[derive(Debug, Clone)]
pub struct EffectivePolicy {
    value: Value,
    document: PolicyDocument,
    digest: ContentDigest,
}

impl EffectivePolicy {
    /// Build from an already-merged value. No schema or constraint check is
    /// performed here; see [`crate::merge::merge`] and
    /// [`EffectivePolicy::load`].
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Model` if the value does not fit the typed
    /// model, or `Canonicalization` if it cannot be digested.
    pub fn from_value(value: Value) -> PolicyResult<Self> {
        let document = PolicyDocument::from_value(&value).map_err(|e| PolicyError::Model {
            origin: "effective policy".to_string(),
            reason: e.to_string(),
        })?;
        let digest = sha256_digest(&CanonicalBytes::new(&value)?);
        Ok(Self {
            value,
            document,
            digest,
        })
    }

    /// Load a previously merged policy from disk and schema-check it.
    pub fn load(path: &Path, validator: &SchemaValidator) -> PolicyResult<Self> {
        let value = load_document(path).map_err(|e| PolicyError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let violations = validator.violations(&value, SchemaKind::Policy.file_name())?;
        if !violations.is_empty() {
            return Err(PolicyError::Schema {
                origin: path.display().to_string(),
                violations: ValidationViolations::from(violations),
            });
        }
        Self::from_value(value)
    }

    /// Merged document as JSON.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Typed view.
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Digest over the canonical bytes.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// Enforcement mode.
    pub fn mode(&self) -> Mode {
        self.document.mode()
    }

    /// Version label, if the policy carries one.
    pub fn version(&self) -> Option<String> {
        self.document.version_label()
    }

    /// Rule declarations in evaluation order.
    pub fn rules(&self) -> &OrderedMap<RuleDeclaration> {
        &self.document.rules
    }

    /// Waivers embedded in the policy.
    pub fn waivers(&self) -> &[Waiver] {
        &self.document.waivers
    }

    /// Pretty JSON in insertion order. Identical inputs give identical text.
    pub fn to_json_pretty(&self) -> PolicyResult<String> {
        Ok(serde_json::to_string_pretty(&self.value)?)
    }
}
