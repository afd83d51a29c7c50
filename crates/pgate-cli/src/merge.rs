//! # Merge Subcommand
//!
//! Merges a repository override onto the organization baseline and prints
//! the effective policy. A refused merge prints one line per violation and
//! exits 1; nothing is written.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pgate_policy::{load_policy_value, merge, MergeError};

use crate::config::CliConfig;
use crate::{emit, schema_validator, EXIT_FAILURE};

/// Arguments for `pgate merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Organization baseline policy (YAML or JSON). Falls back to the
    /// configured baseline.
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Repository override policy.
    #[arg(long = "override", value_name = "OVERRIDE")]
    pub overlay: PathBuf,

    /// Write the effective policy here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the merge subcommand.
///
/// Returns 0 on success and 1 when the merge is refused.
pub fn run_merge(args: &MergeArgs, config: &CliConfig) -> Result<u8> {
    let base_path = args
        .base
        .clone()
        .or_else(|| config.baseline_policy.clone())
        .context("no baseline policy: pass --base or set PGATE_BASELINE_POLICY")?;
    let validator = schema_validator(config)?;

    let base = load_policy_value(&base_path)?;
    let overlay = load_policy_value(&args.overlay)?;

    let outcome = match merge(&base, &overlay, &validator) {
        Ok(outcome) => outcome,
        Err(err @ (MergeError::Schema { .. } | MergeError::Constraint { .. })) => {
            println!("merge refused: {err}");
            for line in err.lines() {
                println!("  {line}");
            }
            return Ok(EXIT_FAILURE);
        }
        Err(other) => return Err(other).context("merge failed"),
    };

    if outcome.requires_out_of_band_approval() {
        eprintln!(
            "note: {} uses `extends: none`; this policy requires out-of-band approval",
            args.overlay.display()
        );
    }

    let text = outcome.effective.to_json_pretty()?;
    let out = args.out.clone().or_else(|| config.effective_policy_path());
    emit(&text, out.as_deref())?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_tightening_override_writes_effective_policy() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.yaml", "mode: enforce\ntests:\n  coverage_min: 50\n");
        let overlay = write(dir.path(), "repo.yaml", "tests:\n  coverage_min: 90\n");
        let out = dir.path().join("effective.json");

        let args = MergeArgs {
            base: Some(base),
            overlay,
            out: Some(out.clone()),
        };
        assert_eq!(run_merge(&args, &CliConfig::default()).unwrap(), 0);

        let effective: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(effective["tests"]["coverage_min"], 90);
    }

    #[test]
    fn test_relaxing_override_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.yaml", "tests:\n  coverage_min: 50\n");
        let overlay = write(dir.path(), "repo.yaml", "tests:\n  coverage_min: 40\n");
        let out = dir.path().join("effective.json");

        let args = MergeArgs {
            base: Some(base),
            overlay,
            out: Some(out.clone()),
        };
        assert_eq!(run_merge(&args, &CliConfig::default()).unwrap(), EXIT_FAILURE);
        assert!(!out.exists());
    }

    #[test]
    fn test_schema_violation_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.yaml", "mode: enforce\n");
        let overlay = write(dir.path(), "repo.yaml", "mode: sometimes\n");
        let args = MergeArgs {
            base: Some(base),
            overlay,
            out: Some(dir.path().join("effective.json")),
        };
        assert_eq!(run_merge(&args, &CliConfig::default()).unwrap(), EXIT_FAILURE);
    }

    #[test]
    fn test_baseline_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.yaml", "mode: enforce\n");
        let overlay = write(dir.path(), "repo.yaml", "extends: org\n");
        let config = CliConfig {
            baseline_policy: Some(base),
            output_dir: Some(dir.path().join("out")),
            ..Default::default()
        };
        let args = MergeArgs {
            base: None,
            overlay,
            out: None,
        };
        assert_eq!(run_merge(&args, &config).unwrap(), 0);
        assert!(dir.path().join("out/effective-policy.json").exists());
    }

    #[test]
    fn test_missing_input_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = write(dir.path(), "repo.yaml", "mode: enforce\n");
        let args = MergeArgs {
            base: Some(dir.path().join("missing.yaml")),
            overlay: overlay.clone(),
            out: None,
        };
        assert!(run_merge(&args, &CliConfig::default()).is_err());

        let args = MergeArgs {
            base: None,
            overlay,
            out: None,
        };
        assert!(run_merge(&args, &CliConfig::default()).is_err());
    }
}
