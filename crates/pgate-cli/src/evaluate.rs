//! # Evaluate Subcommand
//!
//! Loads an effective policy, one evidence bundle (a file or a directory of
//! per-domain files) and an optional waiver list, and writes the decision
//! record. Exit code is 0 whenever evaluation completes, whatever the
//! status: gating on `status == "failed"` is the caller's job.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pgate_evidence::{load_coverage_baseline, EvidenceBundle};
use pgate_policy::{load_waivers, EffectivePolicy, Waiver};
use pgate_rules::DecisionEngine;

use crate::config::CliConfig;
use crate::{emit, resolve_now, schema_validator};

/// Arguments for `pgate evaluate`.
#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("evidence_source")
        .required(true)
        .args(["evidence", "evidence_dir"])
))]
pub struct EvaluateArgs {
    /// Effective policy produced by `pgate merge`.
    #[arg(long)]
    pub policy: PathBuf,

    /// Single evidence bundle (YAML or JSON).
    #[arg(long)]
    pub evidence: Option<PathBuf>,

    /// Directory of per-domain evidence files (tests.json, coverage.json, ...).
    #[arg(long)]
    pub evidence_dir: Option<PathBuf>,

    /// Waiver list applied on top of waivers embedded in the policy.
    #[arg(long)]
    pub waivers: Option<PathBuf>,

    /// Prior decision record; its coverage becomes the baseline.
    #[arg(long)]
    pub baseline_decision: Option<PathBuf>,

    /// Evaluation instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long)]
    pub now: Option<String>,

    /// Write the decision here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the evaluate subcommand.
pub fn run_evaluate(args: &EvaluateArgs, config: &CliConfig) -> Result<u8> {
    let validator = schema_validator(config)?;
    let now = resolve_now(args.now.as_deref())?;

    let policy = EffectivePolicy::load(&args.policy, &validator)
        .with_context(|| format!("cannot use policy {}", args.policy.display()))?;

    let evidence = match (&args.evidence, &args.evidence_dir) {
        (Some(file), _) => EvidenceBundle::load(file, &validator)?,
        (None, Some(dir)) => EvidenceBundle::load_dir(dir, &validator)?,
        (None, None) => anyhow::bail!("one of --evidence or --evidence-dir is required"),
    };

    let baseline = match &args.baseline_decision {
        Some(path) => load_coverage_baseline(path)?,
        None => None,
    };
    let evidence = evidence.with_coverage_baseline(baseline);

    let waivers: Vec<Waiver> = match &args.waivers {
        Some(path) => load_waivers(path, &validator)?,
        None => Vec::new(),
    };

    let decision = DecisionEngine::new(&policy).evaluate(&evidence, &waivers, now);
    let text = decision.to_json_pretty()?;

    let out = args.out.clone().or_else(|| config.decision_path());
    emit(&text, out.as_deref())?;
    if out.is_some() {
        eprintln!("decision: {} (score {})", decision.status, decision.score);
    }
    Ok(0)
}
