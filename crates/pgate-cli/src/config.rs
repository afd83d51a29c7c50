//! CLI configuration.
//!
//! Three layers, later ones winning:
//!
//! 1. an optional YAML file passed with `--config`;
//! 2. environment variables;
//! 3. explicit command-line flags.
//!
//! Variables:
//! - `PGATE_SCHEMA_DIR`: directory of schema overrides
//! - `PGATE_LOG_FORMAT`: `text` or `json`
//! - `PGATE_OUTPUT_DIR`: where `merge` and `evaluate` write their output
//! - `PGATE_BASELINE_POLICY`: organization baseline used by `merge`

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Decision file name used under `output_dir` when none is configured.
pub const DEFAULT_DECISION_FILE: &str = "decision.json";

/// Effective policy file name used under `output_dir`.
pub const EFFECTIVE_POLICY_FILE: &str = "effective-policy.json";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("unknown log format {other:?} (expected text or json)"),
        }
    }
}

/// Settings shared by all subcommands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Schema override directory.
    pub schema_dir: Option<PathBuf>,
    /// Log line format.
    pub log_format: LogFormat,
    /// Where outputs go when no `--out` is given.
    pub output_dir: Option<PathBuf>,
    /// File name of the decision record under `output_dir`.
    pub decision_file: Option<String>,
    /// Organization baseline used when `merge` has no `--base`.
    pub baseline_policy: Option<PathBuf>,
}

impl CliConfig {
    /// Read a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// File (if any) with process environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = non_empty("PGATE_SCHEMA_DIR") {
            self.schema_dir = Some(PathBuf::from(dir));
        }
        if let Some(format) = non_empty("PGATE_LOG_FORMAT") {
            self.log_format = format
                .parse()
                .context("invalid PGATE_LOG_FORMAT")?;
        }
        if let Some(dir) = non_empty("PGATE_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = non_empty("PGATE_BASELINE_POLICY") {
            self.baseline_policy = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Where the decision record goes when `--out` is not given.
    pub fn decision_path(&self) -> Option<PathBuf> {
        let dir = self.output_dir.as_ref()?;
        let name = self.decision_file.as_deref().unwrap_or(DEFAULT_DECISION_FILE);
        Some(dir.join(name))
    }

    /// Where the effective policy goes when `--out` is not given.
    pub fn effective_policy_path(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|d| d.join(EFFECTIVE_POLICY_FILE))
    }
}
