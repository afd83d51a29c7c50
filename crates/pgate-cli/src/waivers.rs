//! # Waivers Subcommand
//!
//! Audits a waiver list: which waivers are active, which expire within a
//! few days, which have expired and which can never apply.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use pgate_policy::load_waivers;
use pgate_rules::{audit_waivers, WaiverAudit, WaiverStatus};

use crate::config::CliConfig;
use crate::{resolve_now, schema_validator, EXIT_FAILURE};

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One line per waiver.
    #[default]
    Text,
    /// The audit as a JSON array.
    Json,
}

/// Arguments for `pgate waivers`.
#[derive(Args, Debug)]
pub struct WaiversArgs {
    /// Waiver list (YAML or JSON).
    #[arg(long)]
    pub file: PathBuf,

    /// Audit instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long)]
    pub now: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Exit 1 if any waiver is expired or invalid.
    #[arg(long)]
    pub strict: bool,
}

/// Execute the waivers subcommand.
pub fn run_waivers(args: &WaiversArgs, config: &CliConfig) -> Result<u8> {
    let validator = schema_validator(config)?;
    let now = resolve_now(args.now.as_deref())?;
    let waivers = load_waivers(&args.file, &validator)?;
    let audit = audit_waivers(&waivers, &now);

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&audit)?),
        ReportFormat::Text => print!("{}", render_text(&audit)),
    }

    let unusable = audit
        .iter()
        .filter(|a| matches!(a.status, WaiverStatus::Expired { .. } | WaiverStatus::Invalid { .. }))
        .count();
    if unusable > 0 {
        tracing::warn!(unusable, "waiver list contains unusable entries");
    }
    Ok(if args.strict && unusable > 0 { EXIT_FAILURE } else { 0 })
}

fn render_text(audit: &[WaiverAudit]) -> String {
    let mut out = String::new();
    for entry in audit {
        let detail = match &entry.status {
            WaiverStatus::Active { days_left } | WaiverStatus::ExpiringSoon { days_left } => {
                format!("{days_left} day(s) left")
            }
            WaiverStatus::Expired { days_ago } => format!("expired {days_ago} day(s) ago"),
            WaiverStatus::Invalid { reason } => reason.clone(),
        };
        let scope = entry
            .waiver
            .scope
            .as_deref()
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{:<14} {}{} ttl={} ({detail})\n",
            entry.status.label(),
            entry.waiver.rule,
            scope,
            entry.waiver.ttl
        ));
    }
    out.push_str(&format!("{} waiver(s)\n", audit.len()));
    out
}
