//! # Validate Subcommand
//!
//! Schema-checks policy, evidence, waiver and decision documents without
//! evaluating anything. Each file prints `OK` or `FAIL` followed by one line
//! per violation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use pgate_schema::{SchemaKind, SchemaValidationError, SchemaValidator};

use crate::config::CliConfig;
use crate::{schema_validator, EXIT_FAILURE};

/// Arguments for `pgate validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Document kind: policy, evidence, waivers or decision.
    #[arg(long)]
    pub kind: SchemaKind,

    /// Files to validate (YAML or JSON).
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 if every file conforms, 1 if any does not.
pub fn run_validate(args: &ValidateArgs, config: &CliConfig) -> Result<u8> {
    let validator = schema_validator(config)?;

    let mut failed = 0usize;
    for path in &args.files {
        if !validate_one(&validator, path, args.kind)? {
            failed += 1;
        }
    }

    if failed > 0 {
        println!(
            "\n{failed} of {} {} document(s) failed validation.",
            args.files.len(),
            args.kind
        );
        Ok(EXIT_FAILURE)
    } else {
        Ok(0)
    }
}

/// Validate one file, printing its report. `Ok(false)` means it does not
/// conform.
fn validate_one(validator: &SchemaValidator, path: &Path, kind: SchemaKind) -> Result<bool> {
    match validator.validate_file(path, kind) {
        Ok(()) => {
            println!("OK:   {}", path.display());
            Ok(true)
        }
        Err(SchemaValidationError::ValidationFailed { violations, .. }) => {
            println!("FAIL: {}", path.display());
            for v in violations.violations() {
                println!("      {v}");
            }
            tracing::debug!(file = %path.display(), count = violations.len(), "document rejected");
            Ok(false)
        }
        Err(other) => Err(other).with_context(|| format!("cannot validate {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_valid_files_exit_zero() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.yaml", "- rule: security.sca\n  ttl: 2026-06-30\n");
        let b = write(dir.path(), "b.json", r#"{"waivers": []}"#);
        let args = ValidateArgs {
            kind: SchemaKind::Waivers,
            files: vec![a, b],
        };
        assert_eq!(run_validate(&args, &CliConfig::default()).unwrap(), 0);
    }

    #[test]
    fn test_any_invalid_file_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.yaml", "mode: advisory\n");
        let bad = write(dir.path(), "bad.yaml", "mode: strict\nunknown: 1\n");
        let args = ValidateArgs {
            kind: SchemaKind::Policy,
            files: vec![good, bad],
        };
        assert_eq!(run_validate(&args, &CliConfig::default()).unwrap(), EXIT_FAILURE);
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = ValidateArgs {
            kind: SchemaKind::Evidence,
            files: vec![dir.path().join("missing.json")],
        };
        assert!(run_validate(&args, &CliConfig::default()).is_err());
    }
}
