#![deny(missing_docs)]

//! # pgate-cli: The `pgate` Command Line
//!
//! Thin shell around the library crates. Every subcommand handler returns
//! `anyhow::Result<u8>`: `Ok(code)` is the process exit code, `Err` means an
//! input could not be read and maps to exit code 2.
//!
//! ## Subcommands
//!
//! - `pgate merge` merges a baseline and an override into the effective
//!   policy; exit 1 with one line per violation when refused.
//! - `pgate evaluate` turns an effective policy, evidence and waivers into
//!   a decision record; exit 0 whenever evaluation completes.
//! - `pgate validate` schema-checks policy, evidence, waiver and decision
//!   documents.
//! - `pgate waivers` audits a waiver list for expired and expiring entries.
//!
//! ```bash
//! pgate merge --base org/policy.yaml --override .pgate/policy.yaml --out effective.json
//! pgate evaluate --policy effective.json --evidence-dir evidence/ --waivers waivers.yaml
//! ```

pub mod config;
pub mod evaluate;
pub mod merge;
pub mod validate;
pub mod waivers;

use std::path::Path;

use anyhow::{Context, Result};

use pgate_core::Timestamp;
use pgate_schema::SchemaValidator;

pub use config::{CliConfig, LogFormat};

/// Exit code for a refused merge or failed validation.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for missing or unreadable inputs.
pub const EXIT_INPUT_ERROR: u8 = 2;

/// Built-in schemas, with on-disk overrides when a schema directory is set.
pub fn schema_validator(config: &CliConfig) -> Result<SchemaValidator> {
    let validator = match &config.schema_dir {
        Some(dir) => SchemaValidator::with_overrides(dir)
            .with_context(|| format!("failed to load schemas from {}", dir.display()))?,
        None => SchemaValidator::builtin().context("failed to load built-in schemas")?,
    };
    tracing::debug!(schema_count = validator.schema_count(), "schema registry ready");
    Ok(validator)
}

/// Parse `--now`, defaulting to the current time.
pub fn resolve_now(now: Option<&str>) -> Result<Timestamp> {
    match now {
        Some(s) => Timestamp::parse_lenient(s)
            .or_else(|_| Timestamp::parse_expiry(s))
            .with_context(|| format!("invalid --now value {s:?}")),
        None => Ok(Timestamp::now()),
    }
}

/// Write `text` to `path`, creating parent directories, or to stdout.
pub fn emit(text: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "output written");
        }
        None => println!("{text}"),
    }
    Ok(())
}
