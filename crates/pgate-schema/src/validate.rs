//! # Schema Validation
//!
//! Runtime validation of policy, evidence, waiver and decision documents
//! against JSON Schema definitions (Draft 2020-12).
//!
//! Schema validation is the first gate of every run. A policy that fails it
//! is never merged and never evaluated; every violation is reported with the
//! instance path of the offending field.
//!
//! ## Schema Resolution
//!
//! All schemas use `$id` URIs of the form
//! `https://schemas.pgate.dev/<filename>`. The policy schema reuses the
//! waiver definition through a cross-schema `$ref`; the local retriever maps
//! those URIs back to loaded schemas so no network request is ever made.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

use crate::document::load_document;

/// URI prefix of every built-in schema `$id`.
const SCHEMA_URI_PREFIX: &str = "https://schemas.pgate.dev/";

/// Schemas compiled into the binary, keyed by filename.
const BUILTIN_SCHEMAS: &[(&str, &str)] = &[
    (
        "policy.schema.json",
        include_str!("../../../schemas/policy.schema.json"),
    ),
    (
        "evidence.schema.json",
        include_str!("../../../schemas/evidence.schema.json"),
    ),
    (
        "waivers.schema.json",
        include_str!("../../../schemas/waivers.schema.json"),
    ),
    (
        "decision.schema.json",
        include_str!("../../../schemas/decision.schema.json"),
    ),
];

/// Resolves `$ref` URIs to schemas held in memory.
struct LocalSchemaRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        if let Some(value) = self.schemas_by_uri.get(filename) {
            return Ok(value.clone());
        }

        // Unknown references (e.g. draft metaschemas) resolve to an
        // accept-all schema instead of a network fetch.
        Ok(serde_json::json!({}))
    }
}

/// The document kinds pgate validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Base or override policy document.
    Policy,
    /// Evidence bundle.
    Evidence,
    /// Waiver list.
    Waivers,
    /// Decision record.
    Decision,
}

impl SchemaKind {
    /// Schema filename for this kind.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Policy => "policy.schema.json",
            Self::Evidence => "evidence.schema.json",
            Self::Waivers => "waivers.schema.json",
            Self::Decision => "decision.schema.json",
        }
    }

    /// Lowercase label (`policy`, `evidence`, `waivers`, `decision`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Evidence => "evidence",
            Self::Waivers => "waivers",
            Self::Decision => "decision",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaKind {
    type Err = SchemaValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "policy" => Ok(Self::Policy),
            "evidence" => Ok(Self::Evidence),
            "waivers" => Ok(Self::Waivers),
            "decision" => Ok(Self::Decision),
            other => Err(SchemaValidationError::SchemaLoadError {
                schema_name: other.to_string(),
                reason: "unknown document kind (expected policy, evidence, waivers or decision)"
                    .to_string(),
            }),
        }
    }
}

/// Error during schema validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Name of the schema that was validated against.
        schema_name: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The document file could not be loaded or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoadError {
        /// Path to the document that failed to load.
        path: String,
        /// Reason the document could not be loaded.
        reason: String,
    },

    /// The compiled validator could not be built (e.g., invalid schema).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// IO error reading a schema directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, Default)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl From<Vec<Violation>> for ValidationViolations {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {v}")?;
        }
        Ok(())
    }
}

/// A schema validator backed by the `jsonschema` crate.
///
/// Holds parsed schemas keyed by filename. The built-in set is always
/// present; [`SchemaValidator::with_overrides`] replaces entries with files
/// of the same name from a directory.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schemas: BTreeMap<String, Value>,
}

impl SchemaValidator {
    /// Validator over the built-in schemas.
    ///
    /// # Errors
    ///
    /// Returns `SchemaLoadError` if a built-in schema is not valid JSON.
    pub fn builtin() -> Result<Self, SchemaValidationError> {
        let mut schemas = BTreeMap::new();
        for (name, text) in BUILTIN_SCHEMAS {
            let value: Value =
                serde_json::from_str(text).map_err(|e| SchemaValidationError::SchemaLoadError {
                    schema_name: (*name).to_string(),
                    reason: format!("invalid JSON: {e}"),
                })?;
            schemas.insert((*name).to_string(), value);
        }
        Ok(Self { schemas })
    }

    /// Built-in schemas, with every `*.schema.json` in `schema_dir` layered
    /// on top.
    ///
    /// # Errors
    ///
    /// Returns `SchemaLoadError` if the directory or a schema file cannot be
    /// read or parsed.
    pub fn with_overrides(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.as_ref();
        let mut validator = Self::builtin()?;

        let entries =
            std::fs::read_dir(schema_dir).map_err(|e| SchemaValidationError::SchemaLoadError {
                schema_name: schema_dir.display().to_string(),
                reason: format!("cannot read schema directory: {e}"),
            })?;

        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".schema.json") {
                continue;
            }
            let value = load_document(&path).map_err(|e| SchemaValidationError::SchemaLoadError {
                schema_name: name.to_string(),
                reason: e.to_string(),
            })?;
            tracing::debug!(schema = name, dir = %schema_dir.display(), "schema override loaded");
            validator.schemas.insert(name.to_string(), value);
        }

        Ok(validator)
    }

    /// Returns the number of loaded schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Returns the names of all loaded schemas, sorted alphabetically.
    pub fn schema_names(&self) -> Vec<&str> {
        self.schemas.keys().map(|s| s.as_str()).collect()
    }

    /// Look up a loaded schema by filename.
    pub fn get_schema(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Options with a retriever that resolves every loaded schema by `$id`,
    /// canonical URI and bare filename.
    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);

        let mut schemas_by_uri: HashMap<String, Value> = HashMap::new();
        for (filename, value) in &self.schemas {
            schemas_by_uri.insert(format!("{SCHEMA_URI_PREFIX}{filename}"), value.clone());
            if let Some(id_str) = value.get("$id").and_then(|v| v.as_str()) {
                schemas_by_uri.insert(id_str.to_string(), value.clone());
            }
            schemas_by_uri.insert(filename.clone(), value.clone());
        }

        opts.with_retriever(LocalSchemaRetriever { schemas_by_uri });
        opts
    }

    /// Build a compiled `Validator` for a schema by filename.
    ///
    /// # Errors
    ///
    /// Returns `SchemaLoadError` if the schema is not loaded, or
    /// `ValidatorBuildError` if it does not compile.
    pub fn build_validator(&self, schema_name: &str) -> Result<Validator, SchemaValidationError> {
        let schema_value =
            self.schemas
                .get(schema_name)
                .ok_or_else(|| SchemaValidationError::SchemaLoadError {
                    schema_name: schema_name.to_string(),
                    reason: "schema not loaded".to_string(),
                })?;

        self.build_options()
            .build(schema_value)
            .map_err(|e| SchemaValidationError::ValidatorBuildError {
                schema_name: schema_name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Collect every violation of `instance` against a named schema.
    ///
    /// An empty vector means the document is valid.
    pub fn violations(
        &self,
        instance: &Value,
        schema_name: &str,
    ) -> Result<Vec<Violation>, SchemaValidationError> {
        let validator = self.build_validator(schema_name)?;
        Ok(validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect())
    }

    /// Validate a parsed JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` with every violation if the document is
    /// invalid.
    pub fn validate_document(
        &self,
        instance: &Value,
        schema_name: &str,
    ) -> Result<(), SchemaValidationError> {
        let violations = self.violations(instance, schema_name)?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::ValidationFailed {
                schema_name: schema_name.to_string(),
                violations: ValidationViolations { violations },
            })
        }
    }

    /// Validate a parsed document of the given kind.
    pub fn validate_kind(
        &self,
        instance: &Value,
        kind: SchemaKind,
    ) -> Result<(), SchemaValidationError> {
        self.validate_document(instance, kind.file_name())
    }

    /// Load a YAML or JSON file and validate it as the given kind.
    pub fn validate_file(
        &self,
        document_path: &Path,
        kind: SchemaKind,
    ) -> Result<(), SchemaValidationError> {
        let value = load_document(document_path)?;
        self.validate_kind(&value, kind)
            .map_err(|e| match e {
                SchemaValidationError::ValidationFailed { violations, .. } => {
                    SchemaValidationError::ValidationFailed {
                        schema_name: format!("{} ({})", kind.file_name(), document_path.display()),
                        violations,
                    }
                }
                other => other,
            })
    }
}
